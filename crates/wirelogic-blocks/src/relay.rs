//! Relay: passes `value` through while `state` is on
//!
//! Switching the relay off returns the output to its default.

use wirelogic_core::{
    BlockInit, BlockSchema, ConfigurableLogic, Lifecycle, Port, PortDescriptor, PortSchema,
    PortValue, Result, Tickable,
};

pub const KIND: &str = "relay";

pub fn schema() -> BlockSchema {
    BlockSchema::new(
        PortSchema::new()
            .with_port("value", PortDescriptor::number(0.0))
            .with_port("state", PortDescriptor::bool(false)),
        PortSchema::new().with_port("result", PortDescriptor::number(0.0)),
    )
}

#[derive(Debug)]
pub struct Relay {
    logic: ConfigurableLogic,
}

impl Relay {
    pub fn new(init: BlockInit<'_>) -> Result<Self> {
        let off = match init.schema.output.get("result").map(|d| &d.default) {
            Some(PortValue::Number(n)) => *n,
            _ => 0.0,
        };
        let logic = ConfigurableLogic::new(init);
        let value: Port<f64> = logic.input_port("value")?;
        let state: Port<bool> = logic.input_port("state")?;
        let result: Port<f64> = logic.output_port("result")?;
        let events = logic.component().events();

        let closed = state.clone();
        let target = result.clone();
        events.subscribe_observable(
            value.observable(),
            move |sample: &PortValue, _| {
                if closed.get() {
                    target.set(sample.as_number().unwrap_or_default());
                }
            },
            false,
        );

        let source = value.clone();
        events.subscribe_observable(
            state.observable(),
            move |on: &PortValue, _| {
                if *on == PortValue::Bool(true) {
                    result.set(source.get());
                } else {
                    result.set(off);
                }
            },
            true,
        );

        Ok(Self { logic })
    }
}

impl Tickable for Relay {}

configurable_block!(Relay);
