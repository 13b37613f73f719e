//! Shard store trait
//!
//! Defines the interface that all shard storage implementations must follow,
//! plus the integrity inspection used to decide whether a stored shard can be
//! trusted on resume.

use bytes::Bytes;
use shardfarm_core::error::Result;
use shardfarm_core::ShardGenerator;

/// Storage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of shards stored
    pub shard_count: u64,

    /// Total bytes used by shards
    pub bytes_used: u64,

    /// Number of write operations
    pub writes: u64,

    /// Number of shard artifacts removed
    pub deletes: u64,
}

/// Synchronous shard store, keyed by height
///
/// Implementations are called from blocking worker threads and must be
/// safe to share between them.
pub trait ShardStore: Send + Sync {
    /// Store a shard, replacing any existing one at that height
    fn put(&self, height: u64, data: Bytes) -> Result<()>;

    /// Retrieve a shard
    fn get(&self, height: u64) -> Result<Option<Bytes>>;

    /// Stored size of a shard without reading it
    fn size_of(&self, height: u64) -> Result<Option<u64>>;

    /// List stored heights in increasing order
    fn heights(&self) -> Result<Vec<u64>>;

    /// Remove every shard artifact, returning how many were removed.
    /// Clearing an empty store succeeds.
    fn clear(&self) -> Result<usize>;

    /// Get storage statistics
    fn stats(&self) -> Result<StorageStats>;
}

/// How much to trust a shard that is already on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrityCheck {
    /// Exists with exactly `shard_size` bytes
    #[default]
    Size,
    /// Size matches and the content hash equals the regenerated digest
    Digest,
}

/// Result of inspecting a stored shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardState {
    Missing,
    Valid,
    Malformed(String),
}

/// Inspect the shard at `height` against what `generator` would produce
pub fn inspect<S: ShardStore + ?Sized>(
    store: &S,
    generator: &ShardGenerator,
    height: u64,
    check: IntegrityCheck,
) -> Result<ShardState> {
    let expected = generator.shard_size() as u64;
    let size = match store.size_of(height)? {
        Some(size) => size,
        None => return Ok(ShardState::Missing),
    };

    if size != expected {
        return Ok(ShardState::Malformed(format!(
            "size {} != expected {}",
            size, expected
        )));
    }

    if check == IntegrityCheck::Digest {
        let data = match store.get(height)? {
            Some(data) => data,
            None => return Ok(ShardState::Missing),
        };
        if !generator.digest(height).verify(&data) {
            return Ok(ShardState::Malformed("content digest mismatch".to_string()));
        }
    }

    Ok(ShardState::Valid)
}
