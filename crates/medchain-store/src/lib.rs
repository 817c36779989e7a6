//! # MedChain Store
//!
//! Storage for the registry: an append-only, content-addressed set of
//! digests with at-most-once insertion.
//!
//! ## Overview
//!
//! Everything above this crate talks to storage through the [`Store`] trait,
//! the registry's whole capability surface: `register`, `contains`, a few
//! read-only audit queries, and `close`. There is deliberately no update or
//! delete operation. The primary implementation is [`SqliteStore`]; the
//! [`MemoryStore`] has identical semantics and is used in tests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use medchain_core::{hasher, Keypair, RegistrationRequest};
//! use medchain_store::{InsertResult, SqliteStore, Store};
//!
//! async fn example() -> medchain_store::Result<()> {
//!     let store = SqliteStore::open("medchain.db")?;
//!     let keypair = Keypair::generate();
//!     let request = RegistrationRequest::sign(&keypair, hasher::digest(b"%PDF-1.7 ..."));
//!
//!     match store.register(&request).await? {
//!         InsertResult::Inserted(record) => println!("registered at #{}", record.position),
//!         InsertResult::AlreadyExists { existing } => println!("already #{}", existing.position),
//!     }
//!     assert!(store.contains(&request.digest).await?);
//!     store.close().await
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **At-most-once**: the existence check and the insert happen under one
//!   lock (memory) or one immediate transaction (SQLite).
//! - **Duplicates are reported, not swallowed**: a second registration returns
//!   `AlreadyExists` with the original record untouched.
//! - **Append-only**: SQLite triggers abort any UPDATE or DELETE on the
//!   registrations table.
//! - **Explicit lifecycle**: after `close`, every call fails with `Closed`.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, Store};

/// Current time in Unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
