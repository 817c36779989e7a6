//! In-memory implementation of the Store trait.
//!
//! Same semantics as SQLite, no persistence. The whole check-and-insert runs
//! under one write lock.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use medchain_core::{Digest, Registrant, RegistrationRecord, RegistrationRequest};

use crate::error::{Result, StoreError};
use crate::now_millis;
use crate::traits::{InsertResult, Store};

/// In-memory store. All data is lost when the store is dropped.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    records: HashMap<Digest, RegistrationRecord>,
    next_position: u64,
    closed: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                records: HashMap::new(),
                next_position: 1,
                closed: false,
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;
        if inner.closed {
            return Err(StoreError::Closed);
        }
        Ok(inner)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        let inner = self
            .inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;
        if inner.closed {
            return Err(StoreError::Closed);
        }
        Ok(inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn register(&self, request: &RegistrationRequest) -> Result<InsertResult> {
        request
            .verify()
            .map_err(|e| StoreError::Unauthorized(e.to_string()))?;

        let mut inner = self.write()?;

        if let Some(existing) = inner.records.get(&request.digest) {
            debug!(digest = %request.digest, position = existing.position, "digest already registered");
            return Ok(InsertResult::AlreadyExists {
                existing: existing.clone(),
            });
        }

        let record = RegistrationRecord {
            digest: request.digest,
            registrant: request.registrant,
            position: inner.next_position,
            registered_at: now_millis(),
            request_id: request.request_id,
        };
        inner.next_position += 1;
        inner.records.insert(request.digest, record.clone());

        debug!(digest = %record.digest, position = record.position, "digest registered");
        Ok(InsertResult::Inserted(record))
    }

    async fn contains(&self, digest: &Digest) -> Result<bool> {
        Ok(self.read()?.records.contains_key(digest))
    }

    async fn get_record(&self, digest: &Digest) -> Result<Option<RegistrationRecord>> {
        Ok(self.read()?.records.get(digest).cloned())
    }

    async fn records_by(&self, registrant: &Registrant) -> Result<Vec<RegistrationRecord>> {
        let inner = self.read()?;
        let mut records: Vec<RegistrationRecord> = inner
            .records
            .values()
            .filter(|r| r.is_owned_by(registrant))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.position);
        Ok(records)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.read()?.records.len() as u64)
    }

    async fn close(&self) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;
        if !inner.closed {
            inner.closed = true;
            inner.records.clear();
            debug!("memory store closed");
        }
        Ok(())
    }
}
