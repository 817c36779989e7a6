//! Content-type detection and the input policy applied before hashing.
//!
//! Documents must be one of the allow-listed types and no larger than the
//! size ceiling. Both checks run before a single byte reaches SHA-256, so a
//! rejected input never produces a digest and never reaches the registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Default size ceiling: 10 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Number of leading bytes needed to recognise every supported type.
pub const SNIFF_LEN: usize = 8;

const PDF_MAGIC: &[u8] = b"%PDF-";
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Document types a registry client will hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Pdf,
    Jpeg,
    Png,
}

impl ContentType {
    /// All supported types, in allow-list order.
    pub const ALL: [ContentType; 3] = [ContentType::Pdf, ContentType::Jpeg, ContentType::Png];

    /// Detect the type from the leading bytes of a document.
    pub fn sniff(header: &[u8]) -> Option<Self> {
        if header.starts_with(PDF_MAGIC) {
            Some(ContentType::Pdf)
        } else if header.starts_with(PNG_MAGIC) {
            Some(ContentType::Png)
        } else if header.starts_with(JPEG_MAGIC) {
            Some(ContentType::Jpeg)
        } else {
            None
        }
    }

    /// Parse a MIME type. `image/jpg` is accepted as an alias.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "application/pdf" => Some(ContentType::Pdf),
            "image/jpeg" | "image/jpg" => Some(ContentType::Jpeg),
            "image/png" => Some(ContentType::Png),
            _ => None,
        }
    }

    /// Guess from a file extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(ContentType::Pdf),
            "jpg" | "jpeg" => Some(ContentType::Jpeg),
            "png" => Some(ContentType::Png),
            _ => None,
        }
    }

    /// Canonical MIME type.
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Pdf => "application/pdf",
            ContentType::Jpeg => "image/jpeg",
            ContentType::Png => "image/png",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Why an input was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The input exceeds the size ceiling.
    TooLarge { size: u64, max: u64 },
    /// The input is not one of the allow-listed types.
    DisallowedType { detected: Option<ContentType> },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::TooLarge { size, max } => {
                write!(f, "file is {} bytes, limit is {} bytes", size, max)
            }
            RejectReason::DisallowedType { detected: Some(ct) } => {
                write!(f, "content type {} is not allowed", ct)
            }
            RejectReason::DisallowedType { detected: None } => {
                write!(f, "unrecognised content type; only PDF, JPEG and PNG are allowed")
            }
        }
    }
}

/// Size ceiling and type allow-list enforced before hashing.
///
/// An empty `allowed` list disables the type check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputPolicy {
    pub max_bytes: u64,
    pub allowed: Vec<ContentType>,
}

impl Default for InputPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            allowed: ContentType::ALL.to_vec(),
        }
    }
}

impl InputPolicy {
    /// Policy with the default ceiling and no type restriction.
    pub fn any_type() -> Self {
        Self {
            allowed: Vec::new(),
            ..Self::default()
        }
    }

    pub fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_bytes {
            return Err(CoreError::InputRejected(RejectReason::TooLarge {
                size,
                max: self.max_bytes,
            }));
        }
        Ok(())
    }

    pub fn check_type(&self, detected: Option<ContentType>) -> Result<()> {
        if self.allowed.is_empty() {
            return Ok(());
        }
        match detected {
            Some(ct) if self.allowed.contains(&ct) => Ok(()),
            _ => Err(CoreError::InputRejected(RejectReason::DisallowedType { detected })),
        }
    }

    /// Run both checks against a size and a sniffed header.
    pub fn check(&self, size: u64, header: &[u8]) -> Result<Option<ContentType>> {
        self.check_size(size)?;
        let detected = ContentType::sniff(header);
        self.check_type(detected)?;
        Ok(detected)
    }
}
