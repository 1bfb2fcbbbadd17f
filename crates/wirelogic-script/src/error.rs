//! Error types for wirelogic-script

use thiserror::Error;
use wirelogic_core::BlockId;

/// Script loading error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error(transparent)]
    Core(#[from] wirelogic_core::Error),

    #[error("Unrecognized document: {0}")]
    UnknownDocument(String),

    #[error("Duplicate definition: {0}")]
    DuplicateDefinition(String),

    #[error("Wire references unknown block: {0}")]
    UnknownBlock(BlockId),

    #[error("Block {0} has no ports")]
    NotAPortOwner(BlockId),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
