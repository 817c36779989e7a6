//! Document hashing: SHA-256 over the raw bytes of a file.
//!
//! The plain [`digest`] function is pure. The `*_input` and `*_file` variants
//! apply an [`InputPolicy`] first and only hash inputs that pass it.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use sha2::{Digest as _, Sha256};

use crate::content::{ContentType, InputPolicy, RejectReason, SNIFF_LEN};
use crate::digest::Digest;
use crate::error::{CoreError, Result};

const READ_BUF: usize = 64 * 1024;

/// Incremental SHA-256 hasher producing a [`Digest`].
#[derive(Clone, Default)]
pub struct Hasher {
    inner: Sha256,
}

impl Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> Digest {
        Digest(self.inner.finalize().into())
    }
}

/// A digest together with what was learned about the input while hashing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashedInput {
    pub digest: Digest,
    pub size: u64,
    pub content_type: Option<ContentType>,
}

/// Hash a byte slice.
pub fn digest(data: &[u8]) -> Digest {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Hash everything a reader yields.
pub fn digest_reader<R: Read>(mut reader: R) -> Result<Digest> {
    let mut hasher = Hasher::new();
    let mut buf = vec![0u8; READ_BUF];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CoreError::Io(e)),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// Check an in-memory document against the policy, then hash it.
pub fn digest_input(data: &[u8], policy: &InputPolicy) -> Result<HashedInput> {
    let size = data.len() as u64;
    let content_type = policy.check(size, &data[..data.len().min(SNIFF_LEN)])?;
    Ok(HashedInput {
        digest: digest(data),
        size,
        content_type,
    })
}

/// Check a file against the policy, then stream it through SHA-256.
///
/// The size ceiling is checked from metadata before the file is opened for
/// reading, and again while streaming in case the file grows underneath us.
pub fn digest_file(path: &Path, policy: &InputPolicy) -> Result<HashedInput> {
    let size = std::fs::metadata(path)?.len();
    policy.check_size(size)?;

    let mut reader = BufReader::with_capacity(READ_BUF, File::open(path)?);
    let header = read_header(&mut reader)?;
    let content_type = ContentType::sniff(&header);
    policy.check_type(content_type)?;

    let mut hasher = Hasher::new();
    hasher.update(&header);

    // One byte past the ceiling is enough to detect growth.
    let remaining = policy.max_bytes.saturating_add(1).saturating_sub(header.len() as u64);
    let mut limited = reader.take(remaining);
    let mut buf = vec![0u8; READ_BUF];
    let mut total = header.len() as u64;
    loop {
        let n = match limited.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CoreError::Io(e)),
        };
        total += n as u64;
        if total > policy.max_bytes {
            return Err(CoreError::InputRejected(RejectReason::TooLarge {
                size: total,
                max: policy.max_bytes,
            }));
        }
        hasher.update(&buf[..n]);
    }

    Ok(HashedInput {
        digest: hasher.finalize(),
        size: total,
        content_type,
    })
}

fn read_header<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = vec![0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        match reader.read(&mut header[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CoreError::Io(e)),
        }
    }
    header.truncate(filled);
    Ok(header)
}
