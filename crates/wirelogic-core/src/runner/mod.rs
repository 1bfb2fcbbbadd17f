//! Block logic runner
//!
//! The runner owns the live blocks of a plot and drives their per-tick work.
//! Each [`BlockLogicRunner::tick`] increments the tick counter by one and then
//! calls `tick` on every registered, enabled block in insertion order.
//!
//! Blocks may add or remove blocks from inside their own `tick` (or from a
//! reactive cascade it triggers). Those requests are queued and applied once
//! the current tick returns, so the visit list of a tick is fixed when it
//! starts.

mod config;

pub use config::{DtPolicy, RunnerConfig, DEFAULT_DT};

use crate::block::{BlockContext, BlockLogic};
use crate::error::{Error, Result};
use crate::identity::{BlockId, KindId};
use crate::lifecycle::LifecycleState;
use crate::registry::BlockRegistry;
use crate::time::{Clock, Tick, TickCounter};
use crate::value::AttributeBag;
use log::{debug, trace, warn};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

enum Deferred {
    Add(Rc<dyn BlockLogic>),
    Remove(Rc<dyn BlockLogic>),
    Clear,
}

/// Holds the ticking flag for the duration of a tick, including an unwinding one
struct TickingGuard<'a>(&'a Cell<bool>);

impl<'a> TickingGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for TickingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

fn same_block(a: &Rc<dyn BlockLogic>, b: &Rc<dyn BlockLogic>) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

/// Drives registered blocks tick by tick
pub struct BlockLogicRunner {
    config: RunnerConfig,
    blocks: RefCell<Vec<Rc<dyn BlockLogic>>>,
    clock: Cell<Clock>,
    ticks: TickCounter,
    ticking: Cell<bool>,
    deferred: RefCell<Vec<Deferred>>,
}

impl BlockLogicRunner {
    /// Create a runner with the default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a runner with a configuration
    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            config,
            blocks: RefCell::new(Vec::new()),
            clock: Cell::new(Clock::new()),
            ticks: TickCounter::new(),
            ticking: Cell::new(false),
            deferred: RefCell::new(Vec::new()),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Register a block
    ///
    /// A block that is already registered is ignored. With `auto_enable`, a
    /// block still in the Constructed state is enabled. During a tick the
    /// request is applied after the tick returns.
    pub fn add(&self, block: Rc<dyn BlockLogic>) {
        if self.ticking.get() {
            self.deferred.borrow_mut().push(Deferred::Add(block));
            return;
        }
        self.add_now(block);
    }

    fn add_now(&self, block: Rc<dyn BlockLogic>) {
        if self.contains(&block) {
            return;
        }
        debug!("runner: added {} ({})", block.block(), block.kind());
        self.blocks.borrow_mut().push(block.clone());

        if self.config.auto_enable() && block.state() == LifecycleState::Constructed {
            block.enable();
        }
    }

    /// Unregister and destroy a block
    ///
    /// Removing a block that is not registered does nothing. During a tick the
    /// request is applied after the tick returns.
    pub fn remove(&self, block: &Rc<dyn BlockLogic>) {
        if self.ticking.get() {
            self.deferred
                .borrow_mut()
                .push(Deferred::Remove(block.clone()));
            return;
        }
        self.remove_now(block);
    }

    fn remove_now(&self, block: &Rc<dyn BlockLogic>) {
        let removed = {
            let mut blocks = self.blocks.borrow_mut();
            blocks
                .iter()
                .position(|b| same_block(b, block))
                .map(|index| blocks.remove(index))
        };
        if let Some(removed) = removed {
            debug!("runner: removed {} ({})", removed.block(), removed.kind());
            removed.destroy();
        }
    }

    /// Unregister and destroy every block, in insertion order
    pub fn clear(&self) {
        if self.ticking.get() {
            self.deferred.borrow_mut().push(Deferred::Clear);
            return;
        }
        self.clear_now();
    }

    fn clear_now(&self) {
        let blocks = std::mem::take(&mut *self.blocks.borrow_mut());
        debug!("runner: clearing {} blocks", blocks.len());
        for block in &blocks {
            block.destroy();
        }
    }

    /// Create a block through `registry` and register it
    pub fn spawn(
        &self,
        registry: &BlockRegistry,
        kind: &KindId,
        block: BlockId,
        attributes: &AttributeBag,
        context: &BlockContext,
    ) -> Result<Rc<dyn BlockLogic>> {
        let context = context.clone().with_ticks(self.tick_counter());
        let logic = registry.create(kind, block, attributes, &context)?;
        self.add(logic.clone());
        Ok(logic)
    }

    /// Check if a block is registered
    pub fn contains(&self, block: &Rc<dyn BlockLogic>) -> bool {
        self.blocks.borrow().iter().any(|b| same_block(b, block))
    }

    /// Find a registered block by its placement id
    pub fn find(&self, id: BlockId) -> Option<Rc<dyn BlockLogic>> {
        self.blocks
            .borrow()
            .iter()
            .find(|b| b.block() == id)
            .cloned()
    }

    /// Snapshot of registered blocks in insertion order
    pub fn blocks(&self) -> Vec<Rc<dyn BlockLogic>> {
        self.blocks.borrow().clone()
    }

    /// Number of registered blocks
    pub fn len(&self) -> usize {
        self.blocks.borrow().len()
    }

    /// Check if no blocks are registered
    pub fn is_empty(&self) -> bool {
        self.blocks.borrow().is_empty()
    }

    /// Number of completed ticks
    pub fn get_tick(&self) -> Tick {
        self.clock.get().tick
    }

    /// Shared view of the tick counter for blocks built against this runner
    pub fn tick_counter(&self) -> TickCounter {
        self.ticks.clone()
    }

    /// Simulated seconds accepted across all ticks
    pub fn elapsed(&self) -> f64 {
        self.clock.get().elapsed
    }

    /// Advance one tick
    ///
    /// `None` uses the configured default delta. Returns the new tick number.
    pub fn tick(&self, dt: Option<f64>) -> Result<Tick> {
        if self.ticking.get() {
            warn!("runner: nested tick ignored");
            return Ok(self.get_tick());
        }
        let dt = self.resolve_dt(dt.unwrap_or(self.config.default_dt()))?;

        let mut clock = self.clock.get();
        let tick = clock.advance(dt);
        self.clock.set(clock);
        self.ticks.set(tick);
        trace!("runner: tick {} (dt {})", tick, dt);

        let snapshot = self.blocks();
        {
            let _ticking = TickingGuard::enter(&self.ticking);
            for block in &snapshot {
                if block.is_enabled() {
                    block.tick(tick, dt);
                }
            }
        }

        self.apply_deferred();
        Ok(tick)
    }

    fn resolve_dt(&self, dt: f64) -> Result<f64> {
        let dt = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            match self.config.dt_policy() {
                DtPolicy::Reject => return Err(Error::InvalidDelta(dt)),
                DtPolicy::Clamp => {
                    warn!("runner: invalid dt {}, using 0", dt);
                    0.0
                }
            }
        };
        Ok(match self.config.max_dt() {
            Some(max) if dt > max => {
                warn!("runner: dt {} above limit, using {}", dt, max);
                max
            }
            _ => dt,
        })
    }

    fn apply_deferred(&self) {
        let pending = std::mem::take(&mut *self.deferred.borrow_mut());
        for op in pending {
            match op {
                Deferred::Add(block) => self.add_now(block),
                Deferred::Remove(block) => self.remove_now(&block),
                Deferred::Clear => self.clear_now(),
            }
        }
    }
}

impl Default for BlockLogicRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BlockLogicRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockLogicRunner")
            .field("config", &self.config)
            .field("blocks", &self.len())
            .field("tick", &self.get_tick())
            .finish()
    }
}
