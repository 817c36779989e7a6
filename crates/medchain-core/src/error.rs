//! Error types for MedChain Core.

use thiserror::Error;

use crate::content::RejectReason;

/// Core errors that can occur while hashing input or checking requests.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The input was refused before any hashing took place.
    #[error("input rejected: {0}")]
    InputRejected(RejectReason),

    /// The input could not be fully read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("malformed digest: {0}")]
    MalformedDigest(String),

    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("malformed request id: {0}")]
    MalformedRequestId(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
