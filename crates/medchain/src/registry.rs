//! The Registry: hash documents, register digests, verify them later.
//!
//! Every registry call is bounded by `call_timeout`. Writes are retried, but
//! a write whose outcome is unknown (timed out, or the connection dropped
//! mid-call) is never blindly resubmitted: the next round first looks the
//! digest up and settles on whatever the registry already holds. Each call
//! signs one request with a fresh request id and reuses it for every round,
//! so a found record is ours only if it carries that id.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use medchain_core::{
    hasher, ContentType, Digest, HashedInput, InputPolicy, RegistrationReceipt,
    RegistrationRecord, RegistrationRequest,
};
use medchain_store::{InsertResult, Store};
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::identity::IdentityWatch;

/// Outcome of checking a document against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub digest: Digest,
    pub size: u64,
    pub content_type: Option<ContentType>,
    /// The registration record, if the digest is registered.
    pub record: Option<RegistrationRecord>,
}

impl Verification {
    pub fn is_registered(&self) -> bool {
        self.record.is_some()
    }
}

/// Client for one registry.
///
/// Cloning is cheap; clones share the store and the identity handle.
pub struct Registry<S: Store> {
    store: Arc<S>,
    identity: IdentityWatch,
    config: RegistryConfig,
}

impl<S: Store> Clone for Registry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            identity: self.identity.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: Store> Registry<S> {
    /// Create a registry client over `store`.
    pub fn new(store: S, identity: IdentityWatch, config: RegistryConfig) -> Self {
        Self {
            store: Arc::new(store),
            identity,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn identity(&self) -> &IdentityWatch {
        &self.identity
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn policy(&self) -> &InputPolicy {
        &self.config.policy
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Hashing
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply the input policy to a file and hash it. Runs on the blocking pool.
    pub async fn hash_file(&self, path: impl AsRef<Path>) -> Result<HashedInput> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let policy = self.config.policy.clone();

        let hashed = tokio::task::spawn_blocking(move || hasher::digest_file(&path, &policy))
            .await
            .map_err(|e| RegistryError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        debug!(digest = %hashed.digest, size = hashed.size, "file hashed");
        Ok(hashed)
    }

    /// Apply the input policy to in-memory bytes and hash them.
    pub fn hash_bytes(&self, data: &[u8]) -> Result<HashedInput> {
        Ok(hasher::digest_input(data, &self.config.policy)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a digest under the connected identity.
    ///
    /// Succeeds at most once per digest across all clients. A digest that is
    /// already registered fails with [`RegistryError::AlreadyRegistered`],
    /// unless the existing record is the one an earlier round of this same
    /// call wrote before its acknowledgement was lost. A concurrent call
    /// with the same identity does not count as this call.
    pub async fn register(&self, digest: Digest) -> Result<RegistrationReceipt> {
        let keypair = self.identity.current().ok_or(RegistryError::NotConnected)?;
        let request = RegistrationRequest::sign(&keypair, digest);
        let max_attempts = self.config.max_attempts.max(1);

        let mut in_doubt = false;
        let mut submitted = 0u32;
        let mut last_err = None;

        for round in 1..=max_attempts {
            if round > 1 {
                tokio::time::sleep(self.config.retry_backoff).await;
            }

            if in_doubt {
                match self.call("get_record", self.store.get_record(&digest)).await {
                    Ok(Some(existing)) => {
                        return self.settle(&request, existing, submitted);
                    }
                    Ok(None) => debug!(%digest, "earlier submission did not land"),
                    Err(e) if is_transient(&e) => {
                        warn!(%digest, round, error = %e, "re-check failed, will retry");
                        last_err = Some(e);
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            submitted += 1;
            match self.call("register", self.store.register(&request)).await {
                Ok(InsertResult::Inserted(record)) => {
                    info!(
                        %digest,
                        registrant = %record.registrant,
                        position = record.position,
                        attempts = submitted,
                        "digest registered"
                    );
                    return Ok(RegistrationReceipt::new(record, submitted));
                }
                Ok(InsertResult::AlreadyExists { existing }) => {
                    if in_doubt {
                        return self.settle(&request, existing, submitted);
                    }
                    info!(%digest, position = existing.position, "digest already registered");
                    return Err(RegistryError::AlreadyRegistered { digest, existing });
                }
                Err(e) if is_transient(&e) => {
                    warn!(%digest, round, error = %e, "registration outcome unknown, will re-check");
                    in_doubt = true;
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or(RegistryError::Connectivity(
            "registration did not complete".to_string(),
        )))
    }

    /// Decide whether a record found after an in-doubt submission is ours.
    fn settle(
        &self,
        request: &RegistrationRequest,
        existing: RegistrationRecord,
        submitted: u32,
    ) -> Result<RegistrationReceipt> {
        let digest = existing.digest;
        if existing.was_written_by(request) {
            info!(
                %digest,
                position = existing.position,
                request_id = %request.request_id,
                "earlier submission had landed, registration confirmed"
            );
            return Ok(RegistrationReceipt::new(existing, submitted));
        }
        info!(%digest, position = existing.position, "digest already registered");
        Err(RegistryError::AlreadyRegistered { digest, existing })
    }

    /// Hash a file under the input policy and register its digest.
    pub async fn register_file(&self, path: impl AsRef<Path>) -> Result<RegistrationReceipt> {
        let hashed = self.hash_file(path).await?;
        self.register(hashed.digest).await
    }

    /// Hash in-memory bytes under the input policy and register their digest.
    pub async fn register_bytes(&self, data: &[u8]) -> Result<RegistrationReceipt> {
        let hashed = self.hash_bytes(data)?;
        self.register(hashed.digest).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether the digest is registered. Does not need a connected identity.
    pub async fn contains(&self, digest: &Digest) -> Result<bool> {
        let store = &self.store;
        self.read("contains", move || store.contains(digest)).await
    }

    /// The registration record for a digest, if any.
    pub async fn lookup(&self, digest: &Digest) -> Result<Option<RegistrationRecord>> {
        let store = &self.store;
        self.read("get_record", move || store.get_record(digest)).await
    }

    /// Hash a file under the input policy and look its digest up.
    pub async fn verify_file(&self, path: impl AsRef<Path>) -> Result<Verification> {
        let hashed = self.hash_file(path).await?;
        self.verify(hashed).await
    }

    /// Hash in-memory bytes under the input policy and look their digest up.
    pub async fn verify_bytes(&self, data: &[u8]) -> Result<Verification> {
        let hashed = self.hash_bytes(data)?;
        self.verify(hashed).await
    }

    async fn verify(&self, hashed: HashedInput) -> Result<Verification> {
        let record = self.lookup(&hashed.digest).await?;
        debug!(digest = %hashed.digest, registered = record.is_some(), "document verified");
        Ok(Verification {
            digest: hashed.digest,
            size: hashed.size,
            content_type: hashed.content_type,
            record,
        })
    }

    /// Records registered by the connected identity, oldest first.
    pub async fn history(&self) -> Result<Vec<RegistrationRecord>> {
        let registrant = self.identity.registrant().ok_or(RegistryError::NotConnected)?;
        let store = &self.store;
        let registrant = &registrant;
        self.read("records_by", move || store.records_by(registrant))
            .await
    }

    /// Number of registered digests.
    pub async fn count(&self) -> Result<u64> {
        let store = &self.store;
        self.read("count", move || store.count()).await
    }

    /// Close the underlying store. Clones of this registry stop working too.
    pub async fn close(self) -> Result<()> {
        self.call("close", self.store.close()).await?;
        info!("registry closed");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Call plumbing
    // ─────────────────────────────────────────────────────────────────────────

    /// Run one store call under the configured timeout.
    async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = medchain_store::Result<T>>,
    {
        let after = self.config.call_timeout;
        match tokio::time::timeout(after, fut).await {
            Ok(result) => result.map_err(RegistryError::from),
            Err(_) => Err(RegistryError::Timeout { operation, after }),
        }
    }

    /// Run a read, retrying transient failures. Reads are idempotent.
    async fn read<T, F, Fut>(&self, operation: &'static str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = medchain_store::Result<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut round = 1;
        loop {
            match self.call(operation, f()).await {
                Err(e) if is_transient(&e) && round < max_attempts => {
                    warn!(operation, round, error = %e, "read failed, will retry");
                    round += 1;
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                other => return other,
            }
        }
    }
}

/// Failures worth another round. `Closed` is final.
fn is_transient(err: &RegistryError) -> bool {
    matches!(
        err,
        RegistryError::Connectivity(_) | RegistryError::Timeout { .. }
    )
}
