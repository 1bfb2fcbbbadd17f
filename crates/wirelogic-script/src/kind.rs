//! Block kinds declared in script

use serde::{Deserialize, Serialize};
use wirelogic_core::{BlockSchema, KindId};

/// A block kind declared in a script file
///
/// Script kinds have no behavior of their own: their ports are plain
/// configuration that other blocks can wire into and read from (a lamp, a
/// display, a constant source).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindDef {
    /// Registry name
    pub id: KindId,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Port schema
    pub schema: BlockSchema,
}

impl KindDef {
    /// Create a kind definition
    pub fn new(id: impl Into<KindId>, schema: BlockSchema) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            schema,
        }
    }
}
