//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::io;
use std::path::Path;

use medchain_core::{hasher, Digest, Keypair, Registrant, RegistrationRequest};
use medchain_store::MemoryStore;

/// A test fixture with a keypair and memory store.
pub struct TestFixture {
    pub keypair: Keypair,
    pub store: MemoryStore,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self {
            keypair: Keypair::generate(),
            store: MemoryStore::new(),
        }
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            keypair: Keypair::from_seed(&seed),
            store: MemoryStore::new(),
        }
    }

    pub fn registrant(&self) -> Registrant {
        self.keypair.registrant()
    }

    /// Sign a registration of `digest`.
    pub fn request(&self, digest: Digest) -> RegistrationRequest {
        RegistrationRequest::sign(&self.keypair, digest)
    }

    /// Sign a registration of the SHA-256 of `document`.
    pub fn request_for(&self, document: &[u8]) -> RegistrationRequest {
        self.request(hasher::digest(document))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A random digest that no document in a test will collide with.
pub fn random_digest() -> Digest {
    Digest::from_bytes(rand::random())
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[1] = 0x5a;
            TestFixture::with_seed(seed)
        })
        .collect()
}

/// Minimal documents of each accepted type, plus helpers for on-disk inputs.
pub mod samples {
    use super::*;

    /// A small PDF. `tag` is embedded so distinct tags hash differently.
    pub fn pdf(tag: &str) -> Vec<u8> {
        let mut doc = b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj\n% ".to_vec();
        doc.extend_from_slice(tag.as_bytes());
        doc.extend_from_slice(b"\n%%EOF\n");
        doc
    }

    /// PNG signature followed by `body`.
    pub fn png(body: &[u8]) -> Vec<u8> {
        let mut doc = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
        doc.extend_from_slice(body);
        doc
    }

    /// JPEG SOI marker followed by `body`.
    pub fn jpeg(body: &[u8]) -> Vec<u8> {
        let mut doc = vec![0xff, 0xd8, 0xff, 0xe0];
        doc.extend_from_slice(body);
        doc
    }

    /// Write `contents` to `path`.
    pub fn write(path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    /// Write a PDF header and extend the file to `size` bytes.
    ///
    /// The file is sparse on filesystems that support it, so large sizes
    /// cost no disk space.
    pub fn write_sized_pdf(path: &Path, size: u64) -> io::Result<()> {
        std::fs::write(path, b"%PDF-1.7\n")?;
        let file = std::fs::OpenOptions::new().write(true).open(path)?;
        file.set_len(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medchain_core::{ContentType, InputPolicy};
    use medchain_store::Store;

    #[tokio::test]
    async fn test_fixture_request_registers() {
        let fixture = TestFixture::new();
        let request = fixture.request_for(&samples::pdf("a"));

        let result = fixture.store.register(&request).await.unwrap();
        assert!(result.is_inserted());
        assert_eq!(result.record().registrant, fixture.registrant());
    }

    #[test]
    fn test_samples_pass_default_policy() {
        let policy = InputPolicy::default();
        let cases = [
            (samples::pdf("x"), ContentType::Pdf),
            (samples::png(b"IHDR"), ContentType::Png),
            (samples::jpeg(b"JFIF"), ContentType::Jpeg),
        ];
        for (doc, expected) in cases {
            let hashed = hasher::digest_input(&doc, &policy).unwrap();
            assert_eq!(hashed.content_type, Some(expected));
        }
    }

    #[test]
    fn test_sized_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.pdf");
        samples::write_sized_pdf(&path, 4096).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4096);
    }

    #[test]
    fn test_random_digests_differ() {
        assert_ne!(random_digest(), random_digest());
    }

    #[test]
    fn test_multi_party() {
        let parties = multi_party_fixtures(3);

        let ids: Vec<_> = parties.iter().map(|p| p.registrant()).collect();
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_ne!(ids[0], ids[2]);
    }
}
