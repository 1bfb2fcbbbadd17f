//! Memory: a level-triggered latch
//!
//! While `set` is true the output follows `value`; while it is false the
//! output holds whatever it last copied.

use wirelogic_core::{
    BlockInit, BlockSchema, ConfigurableLogic, Lifecycle, Port, PortDescriptor, PortSchema,
    PortValue, Result, Tickable,
};

pub const KIND: &str = "memory";

pub fn schema() -> BlockSchema {
    BlockSchema::new(
        PortSchema::new()
            .with_port("value", PortDescriptor::number(0.0))
            .with_port("set", PortDescriptor::bool(false)),
        PortSchema::new().with_port("result", PortDescriptor::number(0.0)),
    )
}

#[derive(Debug)]
pub struct Memory {
    logic: ConfigurableLogic,
}

impl Memory {
    pub fn new(init: BlockInit<'_>) -> Result<Self> {
        let logic = ConfigurableLogic::new(init);
        let value: Port<f64> = logic.input_port("value")?;
        let set: Port<bool> = logic.input_port("set")?;
        let result: Port<f64> = logic.output_port("result")?;
        let events = logic.component().events();

        let latched = set.clone();
        let target = result.clone();
        events.subscribe_observable(
            value.observable(),
            move |sample: &PortValue, _| {
                if latched.get() {
                    target.set(sample.as_number().unwrap_or_default());
                }
            },
            false,
        );

        let source = value.clone();
        events.subscribe_observable(
            set.observable(),
            move |on: &PortValue, _| {
                if *on == PortValue::Bool(true) {
                    result.set(source.get());
                }
            },
            true,
        );

        Ok(Self { logic })
    }
}

impl Tickable for Memory {}

configurable_block!(Memory);
