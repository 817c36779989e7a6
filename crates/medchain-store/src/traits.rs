//! Store trait: the capability interface of the registry.
//!
//! Callers only ever register or look up digests. There is no way to change
//! or remove a record through this trait, and implementations must not offer one.

use std::sync::Arc;

use async_trait::async_trait;
use medchain_core::{Digest, Registrant, RegistrationRecord, RegistrationRequest};

use crate::error::Result;

/// Result of registering a digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// The digest was absent and is now registered.
    Inserted(RegistrationRecord),
    /// The digest was already registered. The original record is returned unchanged.
    AlreadyExists { existing: RegistrationRecord },
}

impl InsertResult {
    pub fn record(&self) -> &RegistrationRecord {
        match self {
            InsertResult::Inserted(record) => record,
            InsertResult::AlreadyExists { existing } => existing,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertResult::Inserted(_))
    }
}

/// Async interface to registration storage.
///
/// # Design Notes
///
/// - **Atomic check-and-insert**: of any number of concurrent `register` calls
///   for one digest, exactly one returns `Inserted`.
/// - **Positions**: records are numbered 1, 2, 3, ... in insertion order.
/// - **Lifecycle**: a store is usable from construction until `close`.
#[async_trait]
pub trait Store: Send + Sync {
    /// Register the request's digest if it is absent.
    ///
    /// Fails with `Unauthorized` if the signature does not verify; a bad
    /// request never reaches the existence check.
    async fn register(&self, request: &RegistrationRequest) -> Result<InsertResult>;

    /// Whether the digest has been registered.
    async fn contains(&self, digest: &Digest) -> Result<bool>;

    /// The record for a digest, if registered.
    async fn get_record(&self, digest: &Digest) -> Result<Option<RegistrationRecord>>;

    /// All records of one registrant, ordered by position.
    async fn records_by(&self, registrant: &Registrant) -> Result<Vec<RegistrationRecord>>;

    /// Number of registered digests.
    async fn count(&self) -> Result<u64>;

    /// Release the underlying resources. Idempotent.
    async fn close(&self) -> Result<()>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn register(&self, request: &RegistrationRequest) -> Result<InsertResult> {
        (**self).register(request).await
    }

    async fn contains(&self, digest: &Digest) -> Result<bool> {
        (**self).contains(digest).await
    }

    async fn get_record(&self, digest: &Digest) -> Result<Option<RegistrationRecord>> {
        (**self).get_record(digest).await
    }

    async fn records_by(&self, registrant: &Registrant) -> Result<Vec<RegistrationRecord>> {
        (**self).records_by(registrant).await
    }

    async fn count(&self) -> Result<u64> {
        (**self).count().await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}
