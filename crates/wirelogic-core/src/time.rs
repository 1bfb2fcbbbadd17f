//! Time system for tick-based simulation
//!
//! - `Tick` - Logical step counter
//! - `Clock` - Step counter plus the simulated seconds accepted so far
//! - `TickCounter` - Shared read view of a runner's current tick

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;

/// A discrete tick identifier (logical time unit)
pub type Tick = u64;

/// Simulation clock state
///
/// The tick counter advances by exactly one per step, independent of how much
/// simulated time that step covered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Clock {
    /// Current tick number (0 before the first step)
    pub tick: Tick,
    /// Simulated seconds accumulated across all steps
    pub elapsed: f64,
}

impl Clock {
    /// Create a new clock at tick 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next tick, covering `dt` seconds
    pub fn advance(&mut self, dt: f64) -> Tick {
        self.tick += 1;
        self.elapsed += dt;
        self.tick
    }
}

/// The tick a runner is on, shared with the blocks it drives
///
/// Reads the number of the tick in progress, or of the last completed tick
/// between ticks. A counter not attached to a runner stays at 0.
#[derive(Debug, Clone, Default)]
pub struct TickCounter(Rc<Cell<Tick>>);

impl TickCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Tick {
        self.0.get()
    }

    pub(crate) fn set(&self, tick: Tick) {
        self.0.set(tick);
    }
}
