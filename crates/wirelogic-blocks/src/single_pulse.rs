//! Single pulse: turns a rising edge into a one-tick `true`
//!
//! The output goes true as soon as `signal` turns true and is reset to false
//! at the start of the next runner tick. A pulse raised during tick N by a
//! block ticked earlier survives this block's own `tick(N)`, so blocks
//! ticked after it in the same tick still see it.

use std::cell::Cell;
use std::rc::Rc;
use wirelogic_core::{
    BlockInit, BlockSchema, ConfigurableLogic, Lifecycle, Port, PortDescriptor, PortSchema,
    PortValue, Result, Tick, Tickable,
};

pub const KIND: &str = "single_pulse";

pub fn schema() -> BlockSchema {
    BlockSchema::new(
        PortSchema::new().with_port("signal", PortDescriptor::bool(false)),
        PortSchema::new().with_port("result", PortDescriptor::bool(false)),
    )
}

#[derive(Debug)]
pub struct SinglePulse {
    logic: ConfigurableLogic,
    result: Port<bool>,
    // runner tick the current pulse was raised in
    raised_in: Rc<Cell<Option<Tick>>>,
}

impl SinglePulse {
    pub fn new(init: BlockInit<'_>) -> Result<Self> {
        let ticks = init.context.ticks().clone();
        let logic = ConfigurableLogic::new(init);
        let signal: Port<bool> = logic.input_port("signal")?;
        let result: Port<bool> = logic.output_port("result")?;
        let raised_in = Rc::new(Cell::new(None));

        let pulse = result.clone();
        let raised = raised_in.clone();
        logic.component().events().subscribe_observable(
            signal.observable(),
            move |value: &PortValue, _| {
                if *value == PortValue::Bool(true) {
                    raised.set(Some(ticks.get()));
                    pulse.set(true);
                }
            },
            false,
        );

        Ok(Self {
            logic,
            result,
            raised_in,
        })
    }
}

impl Tickable for SinglePulse {
    fn tick(&self, tick: Tick, _dt: f64) {
        if self.raised_in.get().is_some_and(|raised| raised >= tick) {
            return;
        }
        self.raised_in.set(None);
        self.result.set(false);
    }
}

configurable_block!(SinglePulse);
