//! Known-answer vectors for SHA-256.
//!
//! A registered digest is only useful if anyone can recompute it from the
//! document. These vectors pin the hasher to the published SHA-256 outputs.

use medchain_core::{hasher, Digest};

/// A known input and its expected digest.
#[derive(Debug, Clone)]
pub struct KnownAnswer {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Input bytes.
    pub input: Vec<u8>,
    /// Expected digest (hex).
    pub expected: &'static str,
}

impl KnownAnswer {
    pub fn expected_digest(&self) -> Digest {
        Digest::from_hex(self.expected).expect("known-answer vector is valid hex")
    }
}

/// Get all known-answer vectors.
pub fn all_vectors() -> Vec<KnownAnswer> {
    vec![
        KnownAnswer {
            name: "empty input",
            input: Vec::new(),
            expected: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        },
        KnownAnswer {
            name: "abc",
            input: b"abc".to_vec(),
            expected: "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        },
        KnownAnswer {
            name: "hello world",
            input: b"hello world".to_vec(),
            expected: "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        },
        KnownAnswer {
            name: "two-block message",
            input: b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq".to_vec(),
            expected: "248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1",
        },
        KnownAnswer {
            name: "one million a",
            input: vec![b'a'; 1_000_000],
            expected: "cdc76e5c9914fb9281a1c7e284d73e67f1809a48a497200e046d39ccc7112cd0",
        },
    ]
}

/// Check every vector against the hasher, both one-shot and streamed.
pub fn verify_all_vectors() -> Result<(), String> {
    for vector in all_vectors() {
        let expected = vector.expected_digest();

        let one_shot = hasher::digest(&vector.input);
        if one_shot != expected {
            return Err(format!(
                "{}: expected {}, got {}",
                vector.name, vector.expected, one_shot
            ));
        }

        let streamed = hasher::digest_reader(vector.input.as_slice())
            .map_err(|e| format!("{}: {}", vector.name, e))?;
        if streamed != expected {
            return Err(format!(
                "{}: streamed digest {} differs from one-shot",
                vector.name, streamed
            ));
        }
    }
    Ok(())
}
