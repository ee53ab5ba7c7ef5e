//! Hashing primitives for TallyChain

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a hex-encoded SHA-256 digest.
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Hex-encoded SHA-256 digest of some byte content.
///
/// The hex text itself is what gets concatenated and re-hashed by Merkle
/// nodes and block headers, so the value is kept as a lowercase string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of raw bytes.
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Fingerprint(hex::encode(hasher.finalize()))
    }

    /// Fingerprint of the concatenated hex text of two fingerprints.
    pub fn of_pair(left: &Fingerprint, right: &Fingerprint) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(left.0.as_bytes());
        hasher.update(right.0.as_bytes());
        Fingerprint(hex::encode(hasher.finalize()))
    }

    /// Parse a hex digest, normalising to lowercase.
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        if hex_str.len() != FINGERPRINT_HEX_LEN || !hex_str.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Fingerprint(hex_str.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of leading `'0'` hex characters.
    pub fn leading_zeros(&self) -> usize {
        self.0.chars().take_while(|c| *c == '0').count()
    }

    /// True when the first `difficulty` hex characters are all `'0'`.
    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        self.leading_zeros() >= difficulty
    }

    /// Shortened form for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// SHA-256 of a UTF-8 string, hex encoded.
pub fn sha256_hex(text: &str) -> Fingerprint {
    Fingerprint::of(text.as_bytes())
}
