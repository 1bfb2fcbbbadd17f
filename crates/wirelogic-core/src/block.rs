//! Block logic traits
//!
//! A block is composed rather than inherited:
//!
//! - [`Lifecycle`] for enable/disable/destroy over a [`Component`]
//! - [`Tickable`] for per-tick work (no-op by default)
//! - [`PortOwner`] for blocks with input and output [`Config`]s
//! - [`BlockLogic`], the object-safe trait the runner stores
//!
//! Concrete blocks embed a [`ConfigurableLogic`] and subscribe their input
//! ports through its event handler.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::identity::{BlockId, KindId};
use crate::lifecycle::{Component, Lifecycle};
use crate::observable::ObservableValue;
use crate::port::{Port, PortData, PortValue};
use crate::scheduler::Scheduler;
use crate::schema::BlockSchema;
use crate::time::{Tick, TickCounter};
use crate::value::AttributeBag;
use std::fmt;
use std::rc::Rc;

/// Per-tick work
pub trait Tickable {
    /// Called once per runner tick while the block is enabled
    fn tick(&self, _tick: Tick, _dt: f64) {}
}

/// A block with input and output ports
pub trait PortOwner: Lifecycle {
    fn input(&self) -> &Config;

    fn output(&self) -> &Config;

    /// Feed `source` into the input port `port`
    ///
    /// The wire is a fire-immediately subscription owned by this block's
    /// event handler, so it is live exactly while the block is enabled.
    fn wire_input(&self, port: &str, source: &ObservableValue<PortValue>) -> Result<()> {
        let target = self
            .input()
            .get(port)
            .ok_or_else(|| Error::PortNotFound(port.to_string()))?
            .clone();
        let expected = target.get().port_type();
        let got = source.get().port_type();
        if expected != got {
            return Err(Error::PortTypeMismatch {
                port: port.to_string(),
                expected,
                got,
            });
        }

        self.component()
            .events()
            .subscribe_observable(source, move |value, _| target.set(value.clone()), true);
        Ok(())
    }
}

/// The object the runner schedules
pub trait BlockLogic: Lifecycle + Tickable {
    /// Placement this logic belongs to
    fn block(&self) -> BlockId;

    /// Registered kind
    fn kind(&self) -> &KindId;

    /// Port access, for blocks that have ports
    fn as_port_owner(&self) -> Option<&dyn PortOwner> {
        None
    }
}

/// Host services handed to every block at construction
#[derive(Clone)]
pub struct BlockContext {
    scheduler: Rc<dyn Scheduler>,
    ticks: TickCounter,
}

impl BlockContext {
    /// Context with a detached tick counter
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            ticks: TickCounter::new(),
        }
    }

    /// Attach the tick counter of the runner the block will be driven by
    pub fn with_ticks(mut self, ticks: TickCounter) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn scheduler(&self) -> &Rc<dyn Scheduler> {
        &self.scheduler
    }

    pub fn ticks(&self) -> &TickCounter {
        &self.ticks
    }
}

impl fmt::Debug for BlockContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockContext")
            .field("tick", &self.ticks.get())
            .finish_non_exhaustive()
    }
}

/// Everything a factory needs to construct one block
#[derive(Debug, Clone, Copy)]
pub struct BlockInit<'a> {
    pub block: BlockId,
    pub kind: &'a KindId,
    pub schema: &'a BlockSchema,
    pub attributes: &'a AttributeBag,
    pub context: &'a BlockContext,
}

/// Shared state of a block with schema-driven ports
///
/// Inputs are built from the placement attributes; outputs start at their
/// schema defaults.
pub struct ConfigurableLogic {
    block: BlockId,
    kind: KindId,
    input: Config,
    output: Config,
    component: Component,
}

impl ConfigurableLogic {
    pub fn new(init: BlockInit<'_>) -> Self {
        let label = format!("{} ({})", init.block, init.kind);
        Self {
            block: init.block,
            kind: init.kind.clone(),
            input: Config::build(&init.schema.input, init.attributes),
            output: Config::build(&init.schema.output, &AttributeBag::new()),
            component: Component::with_scheduler(label, init.context.scheduler().clone()),
        }
    }

    /// Typed input port
    pub fn input_port<T: PortData>(&self, name: &str) -> Result<Port<T>> {
        self.input.port(name)
    }

    /// Typed output port
    pub fn output_port<T: PortData>(&self, name: &str) -> Result<Port<T>> {
        self.output.port(name)
    }
}

impl Lifecycle for ConfigurableLogic {
    fn component(&self) -> &Component {
        &self.component
    }
}

impl Tickable for ConfigurableLogic {}

impl PortOwner for ConfigurableLogic {
    fn input(&self) -> &Config {
        &self.input
    }

    fn output(&self) -> &Config {
        &self.output
    }
}

impl BlockLogic for ConfigurableLogic {
    fn block(&self) -> BlockId {
        self.block
    }

    fn kind(&self) -> &KindId {
        &self.kind
    }

    fn as_port_owner(&self) -> Option<&dyn PortOwner> {
        Some(self)
    }
}

impl fmt::Debug for ConfigurableLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurableLogic")
            .field("block", &self.block)
            .field("kind", &self.kind)
            .field("state", &self.component.state())
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}
