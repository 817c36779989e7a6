//! Error types for the registry client.

use std::time::Duration;

use medchain_core::{CoreError, Digest, RegistrationRecord, RejectReason};
use medchain_store::StoreError;
use thiserror::Error;

/// Errors that can occur during registry operations.
///
/// None of these are fatal to the process; every variant carries enough
/// context for an actionable message (see [`RegistryError::user_message`]).
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The digest is already registered. Treat as "already verified".
    #[error("digest {digest} is already registered (position {})", .existing.position)]
    AlreadyRegistered {
        digest: Digest,
        existing: RegistrationRecord,
    },

    /// The input was refused before hashing.
    #[error("input rejected: {0}")]
    InputRejected(RejectReason),

    /// No identity is connected, so nothing can be signed.
    #[error("no identity connected")]
    NotConnected,

    /// The registry refused the request's signature.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The registry could not be reached.
    #[error("registry unreachable: {0}")]
    Connectivity(String),

    /// This client's store was closed. Retrying cannot help.
    #[error("registry is closed")]
    Closed,

    /// A registry call did not complete in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Malformed caller input, such as a bad digest string.
    #[error("invalid input: {0}")]
    Invalid(String),

    /// Reading the document failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other storage failure.
    #[error("storage error: {0}")]
    Store(StoreError),
}

impl RegistryError {
    /// Whether trying again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RegistryError::Connectivity(_) | RegistryError::Timeout { .. } | RegistryError::NotConnected
        )
    }

    /// Message suitable for showing to the person who triggered the operation.
    pub fn user_message(&self) -> String {
        match self {
            RegistryError::AlreadyRegistered { existing, .. } => format!(
                "This document was already registered (entry #{}). It is already verified.",
                existing.position
            ),
            RegistryError::InputRejected(RejectReason::TooLarge { max, .. }) => format!(
                "File size must be less than {} MB.",
                max / (1024 * 1024)
            ),
            RegistryError::InputRejected(RejectReason::DisallowedType { .. }) => {
                "Only PDF, JPEG, and PNG files are allowed.".to_string()
            }
            RegistryError::NotConnected => {
                "No signing identity is connected. Load a key and try again.".to_string()
            }
            RegistryError::Unauthorized(_) => {
                "The registry rejected the request signature. Check the key in use.".to_string()
            }
            RegistryError::Connectivity(_) | RegistryError::Timeout { .. } => {
                "The registry could not be reached. Please check the connection and try again."
                    .to_string()
            }
            RegistryError::Closed => "The registry connection has been closed.".to_string(),
            RegistryError::Invalid(msg) => format!("Invalid input: {}", msg),
            RegistryError::Io(e) => format!("Could not read the file: {}", e),
            RegistryError::Store(e) => format!("Registry error: {}", e),
        }
    }
}

impl From<StoreError> for RegistryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unauthorized(msg) => RegistryError::Unauthorized(msg),
            StoreError::Closed => RegistryError::Closed,
            e if e.is_connectivity() => RegistryError::Connectivity(e.to_string()),
            e => RegistryError::Store(e),
        }
    }
}

impl From<CoreError> for RegistryError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InputRejected(reason) => RegistryError::InputRejected(reason),
            CoreError::Io(e) => RegistryError::Io(e),
            CoreError::InvalidSignature | CoreError::InvalidPublicKey => {
                RegistryError::Unauthorized(e.to_string())
            }
            CoreError::MalformedDigest(_)
            | CoreError::MalformedKey(_)
            | CoreError::MalformedRequestId(_) => {
                RegistryError::Invalid(e.to_string())
            }
        }
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
