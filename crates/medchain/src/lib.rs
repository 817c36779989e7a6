//! # MedChain
//!
//! Tamper-evident registration of medical documents. A document is hashed
//! locally with SHA-256 and only its digest is registered; the registry
//! accepts each digest at most once and can later answer whether a digest
//! is present.
//!
//! ## Overview
//!
//! - **Hashing**: documents are checked against an [`InputPolicy`] (size
//!   ceiling, PDF/JPEG/PNG allow-list) before any byte is hashed.
//! - **Registration**: [`Registry::register`] signs the digest with the
//!   connected identity and submits it. A duplicate is reported as
//!   [`RegistryError::AlreadyRegistered`], never as success.
//! - **Verification**: [`Registry::contains`] and [`Registry::verify_file`]
//!   need no identity.
//! - **Identity**: [`IdentityWatch`] holds the signing key. Account switches
//!   take effect on the next write.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use medchain::{IdentityWatch, Registry, RegistryConfig};
//! use medchain::core::Keypair;
//! use medchain::store::SqliteStore;
//!
//! async fn example() -> medchain::Result<()> {
//!     let store = SqliteStore::open("medchain.db")?;
//!     let identity = IdentityWatch::connected(Keypair::generate());
//!     let registry = Registry::new(store, identity, RegistryConfig::default());
//!
//!     let receipt = registry.register_file("prescription.pdf").await?;
//!     println!("registered {} at #{}", receipt.digest(), receipt.position());
//!
//!     assert!(registry.contains(receipt.digest()).await?);
//!     registry.close().await
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `medchain::core` - Digests, hashing, input policy, identities
//! - `medchain::store` - Storage trait, SQLite and in-memory stores

pub mod config;
pub mod error;
pub mod identity;
pub mod registry;

pub use medchain_core as core;
pub use medchain_store as store;

pub use config::RegistryConfig;
pub use error::{RegistryError, Result};
pub use identity::{IdentitySubscription, IdentityWatch};
pub use registry::{Registry, Verification};

pub use medchain_core::{
    ContentType, Digest, HashedInput, InputPolicy, Keypair, Registrant, RegistrationReceipt,
    RegistrationRecord, RejectReason, RequestId, DEFAULT_MAX_BYTES,
};
