//! # MedChain Core
//!
//! Pure primitives for MedChain: digests, document hashing, input policy,
//! registrant identities and signed registration requests.
//!
//! This crate contains no storage and no networking. The only I/O it performs
//! is reading the bytes of a document that is about to be hashed.
//!
//! ## Key Types
//!
//! - [`Digest`] - 32-byte SHA-256 content identifier
//! - [`InputPolicy`] - Size ceiling and content-type allow-list checked before hashing
//! - [`Keypair`] / [`Registrant`] - Ed25519 identity of whoever registers a digest
//! - [`RegistrationRequest`] - A digest signed by its registrant
//! - [`RegistrationRecord`] - What the registry keeps for a registered digest
//!
//! ## Hashing
//!
//! ```rust
//! use medchain_core::{hasher, InputPolicy};
//!
//! let pdf = b"%PDF-1.7\n...".to_vec();
//! let hashed = hasher::digest_input(&pdf, &InputPolicy::default()).unwrap();
//! assert_eq!(hashed.digest, hasher::digest(&pdf));
//! ```

pub mod content;
pub mod digest;
pub mod error;
pub mod hasher;
pub mod identity;
pub mod receipt;

pub use content::{ContentType, InputPolicy, RejectReason, DEFAULT_MAX_BYTES};
pub use digest::Digest;
pub use error::{CoreError, Result};
pub use hasher::{digest, digest_file, digest_input, digest_reader, HashedInput, Hasher};
pub use identity::{Keypair, Registrant, Signature};
pub use receipt::{
    RegistrationReceipt, RegistrationRecord, RegistrationRequest, RequestId, REGISTER_DOMAIN,
};
