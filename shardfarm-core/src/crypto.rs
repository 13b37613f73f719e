//! Hashing primitives for shardfarm
//!
//! Blake3 content hashing, used to fingerprint shard content for integrity
//! checks on resume.

use std::fmt;

/// Blake3 hash wrapper for shard fingerprints
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(blake3::Hash);

impl ContentHash {
    /// Compute Blake3 hash of data using multiple threads (for large data)
    pub fn compute_parallel(data: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update_rayon(data);
        Self(hasher.finalize())
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    /// Verify that data matches this hash
    pub fn verify(&self, data: &[u8]) -> bool {
        self == &Self::compute_parallel(data)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
