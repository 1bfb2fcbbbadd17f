//! Wirelogic Blocks - Reference logic block catalog
//!
//! | kind | inputs | outputs |
//! |---|---|---|
//! | `delay` | `value: number`, `duration: number` | `result: number` |
//! | `memory` | `value: number`, `set: bool` | `result: number` |
//! | `single_pulse` | `signal: bool` | `result: bool` |
//! | `relay` | `value: number`, `state: bool` | `result: number` |
//!
//! Call [`register_builtin`] on a fresh registry to make every kind
//! available by name.

use std::rc::Rc;
use wirelogic_core::{BlockLogic, BlockRegistry, BlockSchema, Result};

/// Implement the lifecycle, port and block traits for a type that wraps a
/// `ConfigurableLogic` in a field named `logic`
macro_rules! configurable_block {
    ($ty:ty) => {
        impl wirelogic_core::Lifecycle for $ty {
            fn component(&self) -> &wirelogic_core::Component {
                wirelogic_core::Lifecycle::component(&self.logic)
            }
        }

        impl wirelogic_core::PortOwner for $ty {
            fn input(&self) -> &wirelogic_core::Config {
                wirelogic_core::PortOwner::input(&self.logic)
            }

            fn output(&self) -> &wirelogic_core::Config {
                wirelogic_core::PortOwner::output(&self.logic)
            }
        }

        impl wirelogic_core::BlockLogic for $ty {
            fn block(&self) -> wirelogic_core::BlockId {
                wirelogic_core::BlockLogic::block(&self.logic)
            }

            fn kind(&self) -> &wirelogic_core::KindId {
                wirelogic_core::BlockLogic::kind(&self.logic)
            }

            fn as_port_owner(&self) -> Option<&dyn wirelogic_core::PortOwner> {
                Some(self)
            }
        }
    };
}

pub mod delay;
pub mod memory;
pub mod relay;
pub mod single_pulse;

pub use delay::Delay;
pub use memory::Memory;
pub use relay::Relay;
pub use single_pulse::SinglePulse;

/// Register every reference block kind
pub fn register_builtin(registry: &mut BlockRegistry) -> Result<()> {
    registry.register(delay::KIND, delay::schema(), |init| boxed(Delay::new(init)))?;
    registry.register(memory::KIND, memory::schema(), |init| boxed(Memory::new(init)))?;
    registry.register(single_pulse::KIND, single_pulse::schema(), |init| {
        boxed(SinglePulse::new(init))
    })?;
    registry.register(relay::KIND, relay::schema(), |init| boxed(Relay::new(init)))?;
    Ok(())
}

/// Schema of a built-in kind by name
pub fn builtin_schema(kind: &str) -> Option<BlockSchema> {
    match kind {
        delay::KIND => Some(delay::schema()),
        memory::KIND => Some(memory::schema()),
        single_pulse::KIND => Some(single_pulse::schema()),
        relay::KIND => Some(relay::schema()),
        _ => None,
    }
}

fn boxed<B: BlockLogic + 'static>(block: Result<B>) -> Result<Rc<dyn BlockLogic>> {
    Ok(Rc::new(block?))
}
