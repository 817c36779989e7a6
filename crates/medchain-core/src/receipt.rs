//! Registration requests, stored records and the receipts handed back to callers.
//!
//! A request is a digest signed by its registrant. The signed message is
//! `REGISTER_DOMAIN || digest || request_id`, so a signature can never be
//! replayed as anything other than that one registration of that exact digest.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::digest::Digest;
use crate::error::{CoreError, Result};
use crate::identity::{Keypair, Registrant, Signature};

/// Domain separator for registration signatures.
pub const REGISTER_DOMAIN: &[u8] = b"medchain/register/v1";

/// Random identifier of one registration attempt.
///
/// Ed25519 signatures are deterministic, so two requests for the same digest
/// by the same key are otherwise indistinguishable. The id is what lets a
/// client recognise its own write after the acknowledgement was lost.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub [u8; 16]);

impl RequestId {
    pub const LEN: usize = 16;

    pub fn random() -> Self {
        Self(rand::random())
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CoreError::MalformedRequestId(e.to_string()))?;
        let bytes: [u8; 16] = bytes.try_into().map_err(|b: Vec<u8>| {
            CoreError::MalformedRequestId(format!("{} bytes, expected 16", b.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self.to_hex())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RequestId::from_hex(&s).map_err(de::Error::custom)
    }
}

/// Build the message a registrant signs for one registration of `digest`.
pub fn register_message(digest: &Digest, request_id: &RequestId) -> Vec<u8> {
    let mut msg = Vec::with_capacity(REGISTER_DOMAIN.len() + Digest::LEN + RequestId::LEN);
    msg.extend_from_slice(REGISTER_DOMAIN);
    msg.extend_from_slice(digest.as_bytes());
    msg.extend_from_slice(request_id.as_bytes());
    msg
}

/// A signed request to register a digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub digest: Digest,
    pub registrant: Registrant,
    pub request_id: RequestId,
    pub signature: Signature,
}

impl RegistrationRequest {
    /// Sign a registration of `digest` with `keypair` under a fresh request id.
    pub fn sign(keypair: &Keypair, digest: Digest) -> Self {
        Self::sign_with_id(keypair, digest, RequestId::random())
    }

    /// Sign a registration of `digest` under a caller-chosen request id.
    pub fn sign_with_id(keypair: &Keypair, digest: Digest, request_id: RequestId) -> Self {
        Self {
            digest,
            registrant: keypair.registrant(),
            request_id,
            signature: keypair.sign(&register_message(&digest, &request_id)),
        }
    }

    /// Check the signature against the claimed registrant.
    pub fn verify(&self) -> Result<()> {
        self.registrant.verify(
            &register_message(&self.digest, &self.request_id),
            &self.signature,
        )
    }
}

/// What the registry keeps for a registered digest. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub digest: Digest,
    pub registrant: Registrant,
    /// 1-based insertion order within the registry.
    pub position: u64,
    /// Registry clock at insertion (Unix ms).
    pub registered_at: i64,
    /// Id of the request that wrote this record.
    pub request_id: RequestId,
}

impl RegistrationRecord {
    pub fn is_owned_by(&self, registrant: &Registrant) -> bool {
        &self.registrant == registrant
    }

    /// Whether this record was written by `request`, and not merely by the same key.
    pub fn was_written_by(&self, request: &RegistrationRequest) -> bool {
        self.is_owned_by(&request.registrant) && self.request_id == request.request_id
    }
}

/// Proof of a successful registration, returned to the caller for display and audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    pub record: RegistrationRecord,
    /// How many submissions it took before the write was confirmed.
    pub attempts: u32,
}

impl RegistrationReceipt {
    pub fn new(record: RegistrationRecord, attempts: u32) -> Self {
        Self { record, attempts }
    }

    pub fn digest(&self) -> &Digest {
        &self.record.digest
    }

    pub fn registrant(&self) -> &Registrant {
        &self.record.registrant
    }

    pub fn position(&self) -> u64 {
        self.record.position
    }

    pub fn registered_at(&self) -> i64 {
        self.record.registered_at
    }
}
