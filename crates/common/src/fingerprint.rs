// Content fingerprints for change detection.
//
// A fingerprint is the lowercase hex SHA-256 of the document content. It is
// only ever compared for equality; absent and empty content both map to
// `None` so a freshly created document is never reported as changed.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of document content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already computed digest (e.g. read back from storage).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint of non-empty content.
pub fn fingerprint(content: &str) -> Fingerprint {
    let digest = Sha256::digest(content.as_bytes());
    Fingerprint(hex_encode(&digest))
}

/// Fingerprint of optional content. Absent or empty content has no fingerprint.
pub fn fingerprint_of(content: Option<&str>) -> Option<Fingerprint> {
    match content {
        Some(text) if !text.is_empty() => Some(fingerprint(text)),
        _ => None,
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}
