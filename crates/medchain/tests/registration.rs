//! End-to-end registration behavior over the in-memory and SQLite stores.

use std::collections::HashSet;
use std::sync::Arc;

use medchain::store::{MemoryStore, SqliteStore, Store};
use medchain::{
    Digest, IdentityWatch, InputPolicy, Keypair, Registry, RegistryConfig, RegistryError,
    RejectReason,
};
use medchain_testkit::{generators, multi_party_fixtures, samples};
use proptest::prelude::*;

fn connected(seed: u8) -> IdentityWatch {
    IdentityWatch::connected(Keypair::from_seed(&[seed; 32]))
}

fn memory_registry() -> Registry<MemoryStore> {
    Registry::new(MemoryStore::new(), connected(1), RegistryConfig::default())
}

#[tokio::test]
async fn register_then_contains_then_duplicate() {
    let registry = memory_registry();
    let aa = Digest::from_bytes([0xaa; 32]);
    let bb = Digest::from_bytes([0xbb; 32]);

    let receipt = registry.register(aa).await.unwrap();
    assert_eq!(receipt.digest(), &aa);

    assert!(registry.contains(&aa).await.unwrap());
    assert!(!registry.contains(&bb).await.unwrap());

    let err = registry.register(aa).await.unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyRegistered { digest, .. } if digest == aa));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn oversized_file_rejected_before_hashing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.pdf");
    samples::write_sized_pdf(&path, 11 * 1024 * 1024).unwrap();

    let registry = memory_registry();
    let err = registry.register_file(&path).await.unwrap_err();

    assert!(matches!(
        err,
        RegistryError::InputRejected(RejectReason::TooLarge { .. })
    ));
    assert_eq!(err.user_message(), "File size must be less than 10 MB.");
    assert_eq!(registry.count().await.unwrap(), 0);
}

#[tokio::test]
async fn disallowed_file_type_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    samples::write(&path, b"patient notes").unwrap();

    let registry = memory_registry();
    let err = registry.register_file(&path).await.unwrap_err();
    assert_eq!(err.user_message(), "Only PDF, JPEG, and PNG files are allowed.");

    // The same file is fine under a policy that accepts any type.
    let open = Registry::new(
        MemoryStore::new(),
        connected(1),
        RegistryConfig::default().with_policy(InputPolicy::any_type()),
    );
    open.register_file(&path).await.unwrap();
}

#[tokio::test]
async fn register_file_and_verify_file() {
    let dir = tempfile::tempdir().unwrap();
    let registered = dir.path().join("lab-result.png");
    let unknown = dir.path().join("other.png");
    samples::write(&registered, &samples::png(b"hemoglobin 13.5")).unwrap();
    samples::write(&unknown, &samples::png(b"hemoglobin 13.6")).unwrap();

    let registry = memory_registry();
    let receipt = registry.register_file(&registered).await.unwrap();

    let found = registry.verify_file(&registered).await.unwrap();
    assert!(found.is_registered());
    assert_eq!(found.digest, *receipt.digest());
    assert_eq!(found.record.unwrap().position, receipt.position());

    let missing = registry.verify_file(&unknown).await.unwrap();
    assert!(!missing.is_registered());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_have_one_winner() {
    let store = Arc::new(MemoryStore::new());
    let document = samples::pdf("contended discharge summary");

    let mut handles = Vec::new();
    for fixture in multi_party_fixtures(16) {
        let registry = Registry::new(
            Arc::clone(&store),
            IdentityWatch::connected(fixture.keypair),
            RegistryConfig::default(),
        );
        let document = document.clone();
        handles.push(tokio::spawn(async move {
            registry.register_bytes(&document).await
        }));
    }

    let mut winners = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(RegistryError::AlreadyRegistered { .. }) => duplicates += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(duplicates, 15);
}

#[tokio::test]
async fn identity_switch_applies_to_next_write() {
    let registry = memory_registry();
    let first = registry
        .register_bytes(&samples::pdf("first"))
        .await
        .unwrap();

    let second_key = Keypair::from_seed(&[2; 32]);
    registry.identity().switch(second_key.clone());
    let second = registry
        .register_bytes(&samples::pdf("second"))
        .await
        .unwrap();

    assert_eq!(first.registrant(), &Keypair::from_seed(&[1; 32]).registrant());
    assert_eq!(second.registrant(), &second_key.registrant());
    assert_eq!(second.position(), first.position() + 1);

    registry.identity().disconnect();
    assert!(matches!(
        registry.register_bytes(&samples::pdf("third")).await,
        Err(RegistryError::NotConnected)
    ));
}

#[tokio::test]
async fn sqlite_registry_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("medchain.db");
    let document = samples::jpeg(b"x-ray");

    let receipt = {
        let registry = Registry::new(
            SqliteStore::open(&path).unwrap(),
            connected(7),
            RegistryConfig::default(),
        );
        let receipt = registry.register_bytes(&document).await.unwrap();
        registry.close().await.unwrap();
        receipt
    };

    let registry = Registry::new(
        SqliteStore::open(&path).unwrap(),
        connected(8),
        RegistryConfig::default(),
    );
    assert!(registry.contains(receipt.digest()).await.unwrap());

    match registry.register_bytes(&document).await {
        Err(RegistryError::AlreadyRegistered { existing, .. }) => {
            assert_eq!(existing, receipt.record);
        }
        other => panic!("expected AlreadyRegistered, got {other:?}"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Membership only grows, and register succeeds exactly for digests not
    /// seen before.
    #[test]
    fn membership_is_monotonic(
        pool in generators::distinct_digests(8),
        ops in generators::operations(8, 40),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        rt.block_on(async {
            let registry = memory_registry();
            let mut model: HashSet<Digest> = HashSet::new();

            for (is_register, idx) in ops {
                let digest = pool[idx % pool.len()];
                if is_register {
                    let result = registry.register(digest).await;
                    if model.insert(digest) {
                        prop_assert!(result.is_ok());
                    } else {
                        let is_duplicate = matches!(result, Err(RegistryError::AlreadyRegistered { .. }));
                        prop_assert!(is_duplicate);
                    }
                } else {
                    prop_assert_eq!(registry.contains(&digest).await.unwrap(), model.contains(&digest));
                }
            }
            for digest in &model {
                prop_assert!(registry.contains(digest).await.unwrap());
            }
            prop_assert_eq!(registry.count().await.unwrap(), model.len() as u64);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Every registration is attributed to the key that signed it, and to no one else.
    #[test]
    fn history_is_attributed_to_signer(
        keypair in generators::keypair(),
        stranger in generators::registrant(),
        digests in generators::distinct_digests(6),
    ) {
        prop_assume!(stranger != keypair.registrant());
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        rt.block_on(async {
            let registry = Registry::new(
                MemoryStore::new(),
                IdentityWatch::connected(keypair.clone()),
                RegistryConfig::default(),
            );
            for digest in &digests {
                registry.register(*digest).await.unwrap();
            }

            let history = registry.history().await.unwrap();
            prop_assert_eq!(history.len(), digests.len());
            prop_assert!(history.iter().all(|r| r.registrant == keypair.registrant()));
            prop_assert!(registry.store().records_by(&stranger).await.unwrap().is_empty());
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn hashing_is_deterministic(doc in generators::pdf_document(2048)) {
        let registry = memory_registry();
        let a = registry.hash_bytes(&doc).unwrap();
        let b = registry.hash_bytes(&doc).unwrap();
        prop_assert_eq!(a, b);
        prop_assert_eq!(a.digest, medchain::core::digest(&doc));
    }
}
