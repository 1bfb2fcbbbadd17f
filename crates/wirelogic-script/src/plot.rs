//! Plot definitions
//!
//! A plot is a set of placed blocks plus the wires between them:
//!
//! ```text
//! (
//!     name: "blinker",
//!     blocks: [
//!         (id: 1, kind: "single_pulse"),
//!         (id: 2, kind: "delay", attributes: {"duration": Float(0.5)}),
//!     ],
//!     wires: [
//!         (from: (block: 1, port: "result"), to: (block: 2, port: "value")),
//!     ],
//! )
//! ```

use crate::error::{Error, Result};
use indexmap::{IndexMap, IndexSet};
use log::debug;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use wirelogic_core::{
    AttributeBag, BlockContext, BlockId, BlockLogic, BlockLogicRunner, BlockRegistry, KindId,
    ObservableValue, PortValue,
};

/// One block placed in a plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedBlock {
    pub id: BlockId,
    pub kind: KindId,
    /// Raw input attributes, decoded against the kind's input schema
    #[serde(default)]
    pub attributes: AttributeBag,
}

/// A port on a placed block
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub block: BlockId,
    pub port: String,
}

/// An output-to-input connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireDef {
    /// Output port feeding the wire
    pub from: PortRef,
    /// Input port receiving it
    pub to: PortRef,
}

/// A complete plot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlotDef {
    #[serde(default)]
    pub name: String,
    pub blocks: Vec<PlacedBlock>,
    #[serde(default)]
    pub wires: Vec<WireDef>,
}

impl PlotDef {
    /// Parse and validate a plot from RON
    pub fn parse(content: &str) -> Result<Self> {
        let plot: PlotDef = ron::from_str(content)?;
        plot.validate()?;
        Ok(plot)
    }

    /// Check block ids are unique and every wire names a placed block
    pub fn validate(&self) -> Result<()> {
        let mut ids = IndexSet::with_capacity(self.blocks.len());
        for block in &self.blocks {
            if !ids.insert(block.id) {
                return Err(Error::DuplicateDefinition(block.id.to_string()));
            }
        }
        for wire in &self.wires {
            for end in [&wire.from, &wire.to] {
                if !ids.contains(&end.block) {
                    return Err(Error::UnknownBlock(end.block));
                }
            }
        }
        Ok(())
    }

    /// Create, wire and register every block of the plot
    ///
    /// Blocks are created in file order, then wired, then added to `runner`
    /// in file order. If any step fails nothing is added to the runner and
    /// the blocks created so far are torn down.
    pub fn instantiate(
        &self,
        registry: &BlockRegistry,
        runner: &BlockLogicRunner,
        context: &BlockContext,
    ) -> Result<PlotInstance> {
        self.validate()?;

        let context = context.clone().with_ticks(runner.tick_counter());
        let mut blocks = IndexMap::with_capacity(self.blocks.len());
        for placed in &self.blocks {
            let logic = registry.create(&placed.kind, placed.id, &placed.attributes, &context)?;
            blocks.insert(placed.id, logic);
        }
        let instance = PlotInstance { blocks };

        for wire in &self.wires {
            let source = instance.output(&wire.from)?;
            instance
                .port_owner(wire.to.block)?
                .wire_input(&wire.to.port, &source)?;
        }

        for logic in instance.blocks.values() {
            runner.add(logic.clone());
        }
        debug!(
            "plot '{}': {} blocks, {} wires",
            self.name,
            instance.len(),
            self.wires.len()
        );
        Ok(instance)
    }
}

/// The live blocks of an instantiated plot
#[derive(Default)]
pub struct PlotInstance {
    blocks: IndexMap<BlockId, Rc<dyn BlockLogic>>,
}

impl PlotInstance {
    /// Get a block by id
    pub fn get(&self, id: BlockId) -> Option<&Rc<dyn BlockLogic>> {
        self.blocks.get(&id)
    }

    /// Iterate blocks in file order
    pub fn iter(&self) -> impl Iterator<Item = (&BlockId, &Rc<dyn BlockLogic>)> {
        self.blocks.iter()
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Check if the plot has no blocks
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn port_owner(&self, id: BlockId) -> Result<&dyn wirelogic_core::PortOwner> {
        self.blocks
            .get(&id)
            .ok_or(Error::UnknownBlock(id))?
            .as_port_owner()
            .ok_or(Error::NotAPortOwner(id))
    }

    /// The observable behind an output port
    pub fn output(&self, port: &PortRef) -> Result<ObservableValue<PortValue>> {
        let value = self
            .port_owner(port.block)?
            .output()
            .get(&port.port)
            .ok_or_else(|| wirelogic_core::Error::PortNotFound(port.port.clone()))?;
        Ok(value.clone())
    }

    /// The observable behind an input port
    pub fn input(&self, port: &PortRef) -> Result<ObservableValue<PortValue>> {
        let value = self
            .port_owner(port.block)?
            .input()
            .get(&port.port)
            .ok_or_else(|| wirelogic_core::Error::PortNotFound(port.port.clone()))?;
        Ok(value.clone())
    }

    /// Remove (and destroy) every block of this plot from `runner`
    pub fn unload(self, runner: &BlockLogicRunner) {
        for logic in self.blocks.values() {
            runner.remove(logic);
        }
    }
}

impl std::fmt::Debug for PlotInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlotInstance")
            .field("blocks", &self.blocks.keys().collect::<Vec<_>>())
            .finish()
    }
}
