//! Deterministic shard derivation
//!
//! A shard is `shard_size` bytes of BLAKE3 extended output keyed by a seed
//! derived from `(identity, height)`. Anyone holding the identity can
//! regenerate any shard byte-for-byte.

use crate::crypto::ContentHash;
use crate::error::{FarmError, Result};
use crate::identity::Identity;
use bytes::Bytes;

/// Domain separation context for seed derivation
const SEED_CONTEXT: &str = "shardfarm 2024-01-01 shard seed v1";

/// Committed storage capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    max_size: u64,
    shard_size: u64,
}

impl Capacity {
    /// Create a capacity; at least one shard must fit the commitment
    pub fn new(max_size: u64, shard_size: u64) -> Result<Self> {
        if max_size == 0 || shard_size == 0 || usize::try_from(shard_size).is_err() {
            return Err(FarmError::InvalidCapacity {
                max_size,
                shard_size,
            });
        }
        Ok(Self {
            max_size,
            shard_size,
        })
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn shard_size(&self) -> u64 {
        self.shard_size
    }

    /// Number of shards needed to cover `max_size` (rounded up)
    pub fn total_height(&self) -> u64 {
        self.max_size.div_ceil(self.shard_size)
    }
}

/// Pure shard generator for one identity
///
/// Holds no mutable state; clone it into as many workers as needed.
#[derive(Debug, Clone)]
pub struct ShardGenerator {
    identity: Identity,
    shard_size: usize,
}

impl ShardGenerator {
    pub fn new(identity: Identity, capacity: &Capacity) -> Self {
        Self {
            identity,
            // Capacity::new guarantees the shard size fits in memory indexing
            shard_size: capacity.shard_size() as usize,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn shard_size(&self) -> usize {
        self.shard_size
    }

    /// Seed for the shard at `height`
    pub fn seed(&self, height: u64) -> [u8; 32] {
        let mut material = Vec::with_capacity(self.identity.as_bytes().len() + 8);
        material.extend_from_slice(self.identity.as_bytes());
        material.extend_from_slice(&height.to_le_bytes());
        blake3::derive_key(SEED_CONTEXT, &material)
    }

    /// Fill `buf` with the leading `buf.len()` bytes of the shard at `height`
    pub fn fill(&self, height: u64, buf: &mut [u8]) {
        let mut hasher = blake3::Hasher::new_keyed(&self.seed(height));
        hasher.update(&height.to_le_bytes());
        hasher.finalize_xof().fill(buf);
    }

    /// Generate the full shard at `height`
    pub fn generate(&self, height: u64) -> Bytes {
        let mut buf = vec![0u8; self.shard_size];
        self.fill(height, &mut buf);
        Bytes::from(buf)
    }

    /// Fingerprint of the shard at `height`
    pub fn digest(&self, height: u64) -> ContentHash {
        ContentHash::compute_parallel(&self.generate(height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(shard_size: u64) -> ShardGenerator {
        let capacity = Capacity::new(shard_size * 4, shard_size).unwrap();
        ShardGenerator::new(Identity::from_bytes(b"farmer-a".to_vec()), &capacity)
    }

    #[test]
    fn test_total_height_rounds_up() {
        assert_eq!(Capacity::new(1024, 128).unwrap().total_height(), 8);
        assert_eq!(Capacity::new(1025, 128).unwrap().total_height(), 9);
        assert_eq!(Capacity::new(1, 128).unwrap().total_height(), 1);
    }

    #[test]
    fn test_invalid_capacity() {
        assert!(matches!(
            Capacity::new(0, 128),
            Err(FarmError::InvalidCapacity { .. })
        ));
        assert!(matches!(
            Capacity::new(1024, 0),
            Err(FarmError::InvalidCapacity { .. })
        ));
    }

    #[test]
    fn test_generate_is_deterministic() {
        let gen = generator(4096);
        let a = gen.generate(3);
        let b = gen.generate(3);
        assert_eq!(a.len(), 4096);
        assert_eq!(a, b);

        // A fresh generator for the same identity agrees
        assert_eq!(generator(4096).generate(3), a);
    }

    #[test]
    fn test_heights_and_identities_differ() {
        let gen = generator(1024);
        assert_ne!(gen.generate(1), gen.generate(2));

        let capacity = Capacity::new(4096, 1024).unwrap();
        let other = ShardGenerator::new(Identity::from_bytes(b"farmer-b".to_vec()), &capacity);
        assert_ne!(gen.generate(1), other.generate(1));
    }

    #[test]
    fn test_fill_is_prefix_of_generate() {
        let gen = generator(2048);
        let mut prefix = [0u8; 100];
        gen.fill(5, &mut prefix);
        assert_eq!(&gen.generate(5)[..100], &prefix[..]);
    }

    #[test]
    fn test_digest_matches_content() {
        let gen = generator(8192);
        assert!(gen.digest(2).verify(&gen.generate(2)));
        assert_ne!(gen.digest(2), gen.digest(3));
    }
}
