//! Wirelogic Core - Reactive dataflow engine for wired logic blocks
//!
//! This crate provides the building blocks for logic blocks placed in a
//! world and wired output-to-input:
//! - Ordered multicast callbacks (`Signal`, `FilterSignal`)
//! - Observable values with middleware, decorators and derived values
//! - Schema-driven port configuration (`BlockSchema`, `Config`)
//! - Block lifecycle, deferred tasks and the `BlockLogic` traits
//! - An explicit block registry and a tick runner
//!
//! Everything here is single-threaded. Reactive updates run synchronously:
//! setting a port runs every subscriber, and their subscribers, before the
//! call returns.
//!
//! ## Example
//!
//! ```
//! use wirelogic_core::{AttrValue, AttributeBag, Config, PortDescriptor, PortSchema};
//!
//! let schema = PortSchema::new().with_port(
//!     "x",
//!     PortDescriptor::number(0.0).with_range(0.0, 10.0).with_step(1.0),
//! );
//! let mut raw = AttributeBag::new();
//! raw.insert("x".into(), AttrValue::Float(7.6));
//!
//! let config = Config::build(&schema, &raw);
//! let x = config.port::<f64>("x").unwrap();
//! assert_eq!(x.get(), 8.0);
//! ```

pub mod block;
mod config;
mod error;
mod identity;
pub mod lifecycle;
mod observable;
mod port;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod schema;
mod signal;
pub mod time;
mod value;

pub use block::{BlockContext, BlockInit, BlockLogic, ConfigurableLogic, PortOwner, Tickable};
pub use config::Config;
pub use error::{Error, Result};
pub use identity::{BlockId, KindId};
pub use lifecycle::{Component, ComponentHandle, EventHandler, Lifecycle, LifecycleState};
pub use observable::{ObservableValue, ReadonlyObservableValue};
pub use port::{Port, PortData, PortType, PortValue, Vector3};
pub use registry::{BlockDefinition, BlockFactory, BlockRegistry, PlacementRequest};
pub use runner::{BlockLogicRunner, DtPolicy, RunnerConfig, DEFAULT_DT};
pub use scheduler::{Scheduler, SimulatedScheduler, Task, TaskHandle};
pub use schema::{round_to_step, BlockSchema, PortDescriptor, PortSchema};
pub use signal::{Connection, FilterSignal, Signal};
pub use time::{Clock, Tick, TickCounter};
pub use value::{AttrValue, AttributeBag};
