//! # MedChain Testkit
//!
//! Testing utilities for MedChain.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Known-answer vectors**: SHA-256 digests the hasher must reproduce exactly
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Identities, stores and sample documents for test scenarios
//! - **Faults**: Store wrappers that delay or fail calls, for exercising
//!   timeouts and retries
//!
//! ## Known Answers
//!
//! ```rust
//! use medchain_testkit::vectors::{all_vectors, verify_all_vectors};
//!
//! assert!(!all_vectors().is_empty());
//! verify_all_vectors().unwrap();
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use medchain_testkit::generators::document;
//!
//! proptest! {
//!     #[test]
//!     fn digest_is_deterministic(doc in document(4096)) {
//!         prop_assert_eq!(medchain_core::digest(&doc), medchain_core::digest(&doc));
//!     }
//! }
//! ```
//!
//! ## Faults
//!
//! ```rust
//! use std::time::Duration;
//! use medchain_store::MemoryStore;
//! use medchain_testkit::faults::{DelayAt, DelayedStore};
//!
//! // The first registration lands, then its acknowledgement takes 5s.
//! let store = DelayedStore::new(MemoryStore::new(), Duration::from_secs(5), DelayAt::After)
//!     .first_calls(1);
//! ```

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use faults::{DelayAt, DelayedStore, FlakyStore};
pub use fixtures::{multi_party_fixtures, random_digest, samples, TestFixture};
pub use vectors::{all_vectors, verify_all_vectors, KnownAnswer};
