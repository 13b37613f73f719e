//! shardfarm Storage Backend
//!
//! Provides shard storage abstractions and implementations:
//! - `ShardStore` trait for pluggable storage
//! - `FsShardStore` for the on-disk farm
//! - `MemoryShardStore` for testing
//! - `inspect` for deciding whether a stored shard can be reused

pub mod backend;
pub mod fs;
pub mod memory;

pub use backend::{inspect, IntegrityCheck, ShardState, ShardStore, StorageStats};
pub use fs::FsShardStore;
pub use memory::MemoryShardStore;

/// Prefix of in-progress writes
pub const TEMP_PREFIX: &str = ".tmp.";

const SHARD_PREFIX: &str = "shard-";
const SHARD_SUFFIX: &str = ".dat";

/// File name of the shard at `height`
pub fn shard_file_name(height: u64) -> String {
    format!("{}{:010}{}", SHARD_PREFIX, height, SHARD_SUFFIX)
}

/// Parse a shard file name back into its height
pub fn parse_shard_file_name(name: &str) -> Option<u64> {
    let digits = name.strip_prefix(SHARD_PREFIX)?.strip_suffix(SHARD_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
