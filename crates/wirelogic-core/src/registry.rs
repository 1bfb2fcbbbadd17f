//! Block kind registry
//!
//! Maps a [`KindId`] to the schema and factory of that block kind. The
//! registry is an ordinary value built at startup and passed to whatever
//! spawns blocks.

use crate::block::{BlockContext, BlockInit, BlockLogic};
use crate::error::{Error, Result};
use crate::identity::{BlockId, KindId};
use crate::schema::BlockSchema;
use crate::signal::FilterSignal;
use crate::value::AttributeBag;
use indexmap::IndexMap;
use log::{debug, warn};
use std::fmt;
use std::rc::Rc;

/// Constructs one block of a kind
pub type BlockFactory = Box<dyn Fn(BlockInit<'_>) -> Result<Rc<dyn BlockLogic>>>;

/// A registered block kind
pub struct BlockDefinition {
    pub kind: KindId,
    pub schema: BlockSchema,
    pub factory: BlockFactory,
}

impl fmt::Debug for BlockDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockDefinition")
            .field("kind", &self.kind)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Arguments of the placement filter
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementRequest {
    pub kind: KindId,
    pub block: BlockId,
    pub attributes: AttributeBag,
}

/// Registry of block kinds
#[derive(Default)]
pub struct BlockRegistry {
    definitions: IndexMap<KindId, BlockDefinition>,
    placement: FilterSignal<PlacementRequest>,
}

impl BlockRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block kind
    ///
    /// The schema is validated; registering a kind twice is an error.
    pub fn register(
        &mut self,
        kind: impl Into<KindId>,
        schema: BlockSchema,
        factory: impl Fn(BlockInit<'_>) -> Result<Rc<dyn BlockLogic>> + 'static,
    ) -> Result<()> {
        let kind = kind.into();
        if self.definitions.contains_key(&kind) {
            return Err(Error::DuplicateKind(kind));
        }
        schema.validate()?;
        debug!("registered block kind {}", kind);
        self.definitions.insert(
            kind.clone(),
            BlockDefinition {
                kind,
                schema,
                factory: Box::new(factory),
            },
        );
        Ok(())
    }

    /// Look up a kind
    pub fn get(&self, kind: &KindId) -> Option<&BlockDefinition> {
        self.definitions.get(kind)
    }

    /// Check if a kind is registered
    pub fn contains(&self, kind: &KindId) -> bool {
        self.definitions.contains_key(kind)
    }

    /// Registered kinds in registration order
    pub fn kinds(&self) -> impl Iterator<Item = &KindId> {
        self.definitions.keys()
    }

    /// Number of registered kinds
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Predicates consulted before every placement; any `false` vetoes it
    pub fn placement_filter(&self) -> &FilterSignal<PlacementRequest> {
        &self.placement
    }

    /// Construct a block of `kind`
    ///
    /// The block is returned in the Constructed state.
    pub fn create(
        &self,
        kind: &KindId,
        block: BlockId,
        attributes: &AttributeBag,
        context: &BlockContext,
    ) -> Result<Rc<dyn BlockLogic>> {
        let definition = self
            .definitions
            .get(kind)
            .ok_or_else(|| Error::UnknownKind(kind.clone()))?;

        if !self.placement.is_empty() {
            let request = PlacementRequest {
                kind: kind.clone(),
                block,
                attributes: attributes.clone(),
            };
            if !self.placement.fire(&request) {
                warn!("placement of {} as {} rejected", kind, block);
                return Err(Error::PlacementRejected {
                    kind: kind.clone(),
                    block,
                });
            }
        }

        (definition.factory)(BlockInit {
            block,
            kind: &definition.kind,
            schema: &definition.schema,
            attributes,
            context,
        })
    }
}

impl fmt::Debug for BlockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockRegistry")
            .field("kinds", &self.definitions.keys().collect::<Vec<_>>())
            .field("placement_filters", &self.placement.len())
            .finish()
    }
}
