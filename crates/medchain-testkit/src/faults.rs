//! Store wrappers that inject faults.
//!
//! [`DelayedStore`] makes registrations slow, either before the write reaches
//! the inner store or after it has landed. [`FlakyStore`] fails a number of
//! calls with a connectivity error. Both count calls so tests can assert how
//! many submissions a client actually made.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use medchain_core::{Digest, Registrant, RegistrationRecord, RegistrationRequest};
use medchain_store::{InsertResult, Result, Store, StoreError};

/// Where a [`DelayedStore`] sleeps relative to the inner write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayAt {
    /// Sleep, then write. A caller that gives up early leaves nothing behind.
    Before,
    /// Write, then sleep. A caller that gives up early has lost the acknowledgement.
    After,
}

/// Delays `register` calls. Reads pass straight through.
pub struct DelayedStore<S> {
    inner: S,
    delay: Duration,
    at: DelayAt,
    delayed_calls: u32,
    register_calls: AtomicU32,
}

impl<S: Store> DelayedStore<S> {
    /// Delay every registration by `delay`.
    pub fn new(inner: S, delay: Duration, at: DelayAt) -> Self {
        Self {
            inner,
            delay,
            at,
            delayed_calls: u32::MAX,
            register_calls: AtomicU32::new(0),
        }
    }

    /// Only delay the first `n` registrations.
    pub fn first_calls(mut self, n: u32) -> Self {
        self.delayed_calls = n;
        self
    }

    /// Number of `register` calls that reached this wrapper.
    pub fn register_calls(&self) -> u32 {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Store> Store for DelayedStore<S> {
    async fn register(&self, request: &RegistrationRequest) -> Result<InsertResult> {
        let call = self.register_calls.fetch_add(1, Ordering::SeqCst);
        let delayed = call < self.delayed_calls;

        if delayed && self.at == DelayAt::Before {
            tokio::time::sleep(self.delay).await;
        }
        let result = self.inner.register(request).await;
        if delayed && self.at == DelayAt::After {
            tokio::time::sleep(self.delay).await;
        }
        result
    }

    async fn contains(&self, digest: &Digest) -> Result<bool> {
        self.inner.contains(digest).await
    }

    async fn get_record(&self, digest: &Digest) -> Result<Option<RegistrationRecord>> {
        self.inner.get_record(digest).await
    }

    async fn records_by(&self, registrant: &Registrant) -> Result<Vec<RegistrationRecord>> {
        self.inner.records_by(registrant).await
    }

    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}

/// Fails the first `failures` calls, of any kind, with
/// [`StoreError::Unavailable`]. Later calls reach the inner store.
pub struct FlakyStore<S> {
    inner: S,
    failures: u32,
    calls: AtomicU32,
    register_calls: AtomicU32,
}

impl<S: Store> FlakyStore<S> {
    pub fn new(inner: S, failures: u32) -> Self {
        Self {
            inner,
            failures,
            calls: AtomicU32::new(0),
            register_calls: AtomicU32::new(0),
        }
    }

    /// Number of calls of any kind made so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of `register` calls made so far, failed or not.
    pub fn register_calls(&self) -> u32 {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn gate(&self, operation: &str) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(StoreError::Unavailable(format!(
                "injected failure {} of {} ({})",
                call + 1,
                self.failures,
                operation
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: Store> Store for FlakyStore<S> {
    async fn register(&self, request: &RegistrationRequest) -> Result<InsertResult> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.gate("register")?;
        self.inner.register(request).await
    }

    async fn contains(&self, digest: &Digest) -> Result<bool> {
        self.gate("contains")?;
        self.inner.contains(digest).await
    }

    async fn get_record(&self, digest: &Digest) -> Result<Option<RegistrationRecord>> {
        self.gate("get_record")?;
        self.inner.get_record(digest).await
    }

    async fn records_by(&self, registrant: &Registrant) -> Result<Vec<RegistrationRecord>> {
        self.gate("records_by")?;
        self.inner.records_by(registrant).await
    }

    async fn count(&self) -> Result<u64> {
        self.gate("count")?;
        self.inner.count().await
    }

    async fn close(&self) -> Result<()> {
        self.gate("close")?;
        self.inner.close().await
    }
}
