//! Timeouts, retries and lost acknowledgements.
//!
//! A write whose outcome is unknown must never turn into a duplicate
//! submission that the client then reports as "already registered".

use std::sync::Arc;
use std::time::Duration;

use medchain::store::{MemoryStore, Store};
use medchain::{IdentityWatch, Keypair, Registry, RegistryConfig, RegistryError};
use medchain_testkit::{random_digest, DelayAt, DelayedStore, FlakyStore, TestFixture};

fn config() -> RegistryConfig {
    RegistryConfig::default()
        .with_call_timeout(Duration::from_millis(100))
        .with_retry_backoff(Duration::from_millis(10))
        .with_max_attempts(3)
}

fn identity() -> IdentityWatch {
    IdentityWatch::connected(Keypair::from_seed(&[0x42; 32]))
}

#[tokio::test]
async fn timeout_before_write_is_resubmitted() {
    let store = DelayedStore::new(MemoryStore::new(), Duration::from_secs(5), DelayAt::Before)
        .first_calls(1);
    let registry = Registry::new(store, identity(), config());
    let digest = random_digest();

    let receipt = registry.register(digest).await.unwrap();

    assert_eq!(receipt.attempts, 2);
    assert_eq!(registry.store().register_calls(), 2);
    assert!(registry.contains(&digest).await.unwrap());
}

#[tokio::test]
async fn lost_acknowledgement_is_confirmed_not_duplicated() {
    let store = DelayedStore::new(MemoryStore::new(), Duration::from_secs(5), DelayAt::After)
        .first_calls(1);
    let registry = Registry::new(store, identity(), config());
    let digest = random_digest();

    let receipt = registry.register(digest).await.unwrap();

    // The first submission landed; the re-check found it and nothing was resent.
    assert_eq!(receipt.attempts, 1);
    assert_eq!(receipt.position(), 1);
    assert_eq!(registry.store().register_calls(), 1);
    assert_eq!(registry.count().await.unwrap(), 1);
}

#[tokio::test]
async fn in_doubt_write_settles_on_other_registrant() {
    let other = TestFixture::with_seed([0x07; 32]);
    let other_registrant = other.registrant();
    let digest = random_digest();
    other.store.register(&other.request(digest)).await.unwrap();

    let store =
        DelayedStore::new(other.store, Duration::from_secs(5), DelayAt::Before).first_calls(1);
    let registry = Registry::new(store, identity(), config());

    match registry.register(digest).await {
        Err(RegistryError::AlreadyRegistered { existing, .. }) => {
            assert_eq!(existing.registrant, other_registrant);
        }
        other => panic!("expected AlreadyRegistered, got {other:?}"),
    }
    assert_eq!(registry.store().register_calls(), 1);
}

#[tokio::test]
async fn in_doubt_write_does_not_claim_older_own_record() {
    let me = Keypair::from_seed(&[0x42; 32]);
    let inner = MemoryStore::new();
    let digest = random_digest();
    inner
        .register(&medchain::core::RegistrationRequest::sign(&me, digest))
        .await
        .unwrap();
    // Make sure the existing record predates the next call.
    tokio::time::sleep(Duration::from_millis(5)).await;

    let store = DelayedStore::new(inner, Duration::from_secs(5), DelayAt::Before).first_calls(1);
    let registry = Registry::new(store, IdentityWatch::connected(me), config());

    assert!(matches!(
        registry.register(digest).await,
        Err(RegistryError::AlreadyRegistered { .. })
    ));
}

#[tokio::test]
async fn in_doubt_write_does_not_claim_concurrent_call_by_same_key() {
    let shared = Arc::new(MemoryStore::new());
    let digest = random_digest();

    let slow = Registry::new(
        DelayedStore::new(Arc::clone(&shared), Duration::from_secs(5), DelayAt::Before)
            .first_calls(1),
        identity(),
        config(),
    );
    let fast = Registry::new(Arc::clone(&shared), identity(), config());

    let slow_call = tokio::spawn(async move { slow.register(digest).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    let fast_receipt = fast.register(digest).await.unwrap();

    match slow_call.await.unwrap() {
        Err(RegistryError::AlreadyRegistered { existing, .. }) => {
            assert_eq!(existing, fast_receipt.record);
        }
        other => panic!("expected AlreadyRegistered, got {other:?}"),
    }
    assert_eq!(shared.count().await.unwrap(), 1);
}

#[tokio::test]
async fn every_round_timing_out_reports_timeout() {
    let store = DelayedStore::new(MemoryStore::new(), Duration::from_secs(5), DelayAt::Before);
    let registry = Registry::new(store, identity(), config().with_max_attempts(2));

    let err = registry.register(random_digest()).await.unwrap_err();

    assert!(matches!(err, RegistryError::Timeout { operation: "register", .. }));
    assert!(err.is_retryable());
    assert_eq!(registry.store().register_calls(), 2);
    assert_eq!(registry.count().await.unwrap(), 0);
}

#[tokio::test]
async fn connectivity_failure_is_retried() {
    let store = FlakyStore::new(MemoryStore::new(), 1);
    let registry = Registry::new(store, identity(), config());
    let digest = random_digest();

    let receipt = registry.register(digest).await.unwrap();

    assert_eq!(receipt.attempts, 2);
    assert_eq!(registry.store().register_calls(), 2);
    assert!(registry.contains(&digest).await.unwrap());
}

#[tokio::test]
async fn persistent_outage_surfaces_connectivity() {
    let store = FlakyStore::new(MemoryStore::new(), 100);
    let registry = Registry::new(store, identity(), config());

    let err = registry.register(random_digest()).await.unwrap_err();

    assert!(matches!(err, RegistryError::Connectivity(_)));
    assert_eq!(
        err.user_message(),
        "The registry could not be reached. Please check the connection and try again."
    );
    // One submission, then two failed re-checks; never a blind resend.
    assert_eq!(registry.store().register_calls(), 1);
    assert_eq!(registry.store().inner().count().await.unwrap(), 0);
}

#[tokio::test]
async fn closed_store_is_not_retried() {
    let store = FlakyStore::new(MemoryStore::new(), 0);
    store.inner().close().await.unwrap();
    let registry = Registry::new(store, identity(), config());

    assert!(matches!(
        registry.contains(&random_digest()).await,
        Err(RegistryError::Closed)
    ));
    assert_eq!(registry.store().calls(), 1);

    assert!(matches!(
        registry.register(random_digest()).await,
        Err(RegistryError::Closed)
    ));
    assert_eq!(registry.store().register_calls(), 1);
}

#[tokio::test]
async fn reads_are_retried() {
    let store = FlakyStore::new(MemoryStore::new(), 2);
    let registry = Registry::new(store, identity(), config());

    assert!(!registry.contains(&random_digest()).await.unwrap());
    assert_eq!(registry.store().calls(), 3);
}
