//! Error types for wirelogic-core

use crate::{KindId, PortType};
use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Port type mismatch on {port}: expected {expected}, got {got}")]
    PortTypeMismatch {
        port: String,
        expected: PortType,
        got: PortType,
    },

    #[error("Unknown block kind: {0}")]
    UnknownKind(KindId),

    #[error("Duplicate block kind: {0}")]
    DuplicateKind(KindId),

    #[error("Placement rejected for {kind} block {block}")]
    PlacementRejected { kind: KindId, block: crate::BlockId },

    #[error("Invalid tick delta: {0}")]
    InvalidDelta(f64),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
