//! Error types for the binir intermediate representation.
//!
//! Every fallible operation in the crate reports one of these variants. Identity
//! and range violations are caller errors and are always surfaced, never clamped.

use thiserror::Error;
use uuid::Uuid;

use crate::core::addr::Addr;

/// Main error type for IR operations.
#[derive(Debug, Error)]
pub enum IrError {
    /// Byte access that touches an address that was never written
    #[error("Range error: {length} byte(s) at {address} are not fully stored")]
    RangeError { address: Addr, length: u64 },

    /// Image access outside the declared `[min, max]` bounds
    #[error("Out of range: {length} byte(s) at {address} fall outside [{min}, {max}]")]
    OutOfRange {
        address: Addr,
        length: u64,
        min: Addr,
        max: Addr,
    },

    /// A node with this UUID is already live in the registry
    #[error("Duplicate UUID: {0}")]
    DuplicateUuid(Uuid),

    /// CFG edge endpoint that is not a vertex of the graph
    #[error("Unknown CFG vertex: {0}")]
    UnknownVertex(Uuid),

    /// Cross-reference to a node that is not live (or of the wrong kind)
    #[error("Unknown referent: {0}")]
    UnknownReferent(Uuid),

    /// Operation addressed to a node that is not part of the tree
    #[error("Unknown node: {0}")]
    UnknownNode(Uuid),

    /// AuxData value whose stored shape differs from the requested one
    #[error("Type mismatch for aux data '{key}': expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: String,
        found: String,
    },

    /// Wire message that violates the structural contract
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Encoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Resource limit exceeded
    #[error("Resource limit exceeded: {resource} ({used}/{limit})")]
    ResourceExhausted {
        resource: String,
        used: usize,
        limit: usize,
    },

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for IR operations
pub type Result<T> = std::result::Result<T, IrError>;

impl IrError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        IrError::MalformedMessage(message.into())
    }

    /// True for the errors produced while decoding a wire message.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            IrError::MalformedMessage(_) | IrError::TypeMismatch { .. }
        )
    }
}

impl From<bincode::error::DecodeError> for IrError {
    fn from(err: bincode::error::DecodeError) -> Self {
        IrError::MalformedMessage(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for IrError {
    fn from(err: bincode::error::EncodeError) -> Self {
        IrError::Serialization(err.to_string())
    }
}
