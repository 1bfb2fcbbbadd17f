//! Identity types for placed blocks and block kinds

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to a placed block in the world
///
/// The engine never owns the block itself; it only uses the handle to tell
/// block logic instances apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u64);

impl BlockId {
    /// Create a new block ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block:{}", self.0)
    }
}

/// Identifier of a block type in the registry (e.g. "delay", "relay")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KindId(pub String);

impl KindId {
    /// Create a new kind ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for KindId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for KindId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_id() {
        let id = BlockId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(format!("{}", id), "block:42");
    }

    #[test]
    fn test_kind_id() {
        let id = KindId::new("delay");
        assert_eq!(id.as_str(), "delay");
        assert_eq!(format!("{}", id), "delay");
        assert_eq!(KindId::from("delay"), id);
    }
}
