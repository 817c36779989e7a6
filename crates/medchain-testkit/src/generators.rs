//! Proptest generators for property-based testing.

use proptest::prelude::*;

use medchain_core::{Digest, Keypair, Registrant};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random registrant.
pub fn registrant() -> impl Strategy<Value = Registrant> {
    keypair().prop_map(|kp| kp.registrant())
}

/// Generate a random digest.
pub fn digest() -> impl Strategy<Value = Digest> {
    any::<[u8; 32]>().prop_map(Digest::from_bytes)
}

/// Generate a set of distinct digests.
pub fn distinct_digests(max: usize) -> impl Strategy<Value = Vec<Digest>> {
    prop::collection::hash_set(any::<[u8; 32]>(), 1..=max)
        .prop_map(|set| set.into_iter().map(Digest::from_bytes).collect())
}

/// Generate raw document bytes of at most `max_len`.
pub fn document(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a PDF-looking document that passes the default input policy.
pub fn pdf_document(max_body: usize) -> impl Strategy<Value = Vec<u8>> {
    document(max_body).prop_map(|body| {
        let mut doc = b"%PDF-1.7\n".to_vec();
        doc.extend_from_slice(&body);
        doc
    })
}

/// Generate a sequence of register (`true`) / contains (`false`) steps over
/// a small pool of digests, so that repeats are frequent.
pub fn operations(pool: usize, max_len: usize) -> impl Strategy<Value = Vec<(bool, usize)>> {
    prop::collection::vec((any::<bool>(), 0..pool), 0..=max_len)
}
