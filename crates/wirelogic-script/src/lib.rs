//! Wirelogic Script - RON loader for block kinds and plots
//!
//! Loads wiring content from RON files:
//! - Port schemas (`{input, output}`) and script-declared block kinds
//! - Plots: placed blocks with their attributes and the wires between them

mod error;
mod kind;
mod loader;
mod plot;

pub use error::{Error, Result};
pub use kind::KindDef;
pub use loader::{Loader, ScriptDefs};
pub use plot::{PlacedBlock, PlotDef, PlotInstance, PortRef, WireDef};
