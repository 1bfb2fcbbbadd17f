//! Delay: forwards each input change to the output after `duration` seconds
//!
//! Every change of `value` is sampled and scheduled on its own. A second
//! change arriving before the first one is delivered does not cancel it, so
//! the output replays the input sequence shifted in time. Pending deliveries
//! are cancelled when the block is disabled or destroyed.

use log::trace;
use wirelogic_core::{
    BlockInit, BlockSchema, ConfigurableLogic, Lifecycle, Port, PortDescriptor, PortSchema,
    PortValue, Result, Tickable,
};

pub const KIND: &str = "delay";

/// Longest supported delay in seconds
pub const MAX_DURATION: f64 = 60.0;

pub fn schema() -> BlockSchema {
    BlockSchema::new(
        PortSchema::new()
            .with_port("value", PortDescriptor::number(0.0))
            .with_port(
                "duration",
                PortDescriptor::number(1.0)
                    .with_range(0.0, MAX_DURATION)
                    .with_step(0.0)
                    .with_description("Delay in seconds"),
            ),
        PortSchema::new().with_port("result", PortDescriptor::number(0.0)),
    )
}

#[derive(Debug)]
pub struct Delay {
    logic: ConfigurableLogic,
}

impl Delay {
    pub fn new(init: BlockInit<'_>) -> Result<Self> {
        let logic = ConfigurableLogic::new(init);
        let value: Port<f64> = logic.input_port("value")?;
        let duration: Port<f64> = logic.input_port("duration")?;
        let result: Port<f64> = logic.output_port("result")?;

        let component = logic.component().handle();
        let block = init.block;
        logic.component().events().subscribe_observable(
            value.observable(),
            move |sample: &PortValue, _| {
                let sample = sample.as_number().unwrap_or_default();
                let delay = duration.get();
                let result = result.clone();
                trace!("{}: delivering {} in {}s", block, sample, delay);
                component.schedule(delay, move || result.set(sample));
            },
            false,
        );

        Ok(Self { logic })
    }
}

impl Tickable for Delay {}

configurable_block!(Delay);
