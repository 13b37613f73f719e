//! In-memory shard store
//!
//! Used for testing. Not persistent.

use crate::backend::{ShardStore, StorageStats};
use bytes::Bytes;
use parking_lot::RwLock;
use shardfarm_core::error::{FarmError, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory shard store
pub struct MemoryShardStore {
    /// Shard storage
    shards: RwLock<BTreeMap<u64, Bytes>>,

    /// Maximum capacity (0 = unlimited)
    max_capacity: u64,

    /// Current bytes used
    bytes_used: AtomicU64,

    /// Operation counters
    writes: AtomicU64,
    deletes: AtomicU64,
}

impl MemoryShardStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create with a maximum capacity; writes beyond it fail like a full disk
    pub fn with_capacity(max_bytes: u64) -> Self {
        Self {
            shards: RwLock::new(BTreeMap::new()),
            max_capacity: max_bytes,
            bytes_used: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
        }
    }
}

impl Default for MemoryShardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardStore for MemoryShardStore {
    fn put(&self, height: u64, data: Bytes) -> Result<()> {
        let data_len = data.len() as u64;
        let mut shards = self.shards.write();
        let replaced = shards.get(&height).map(|old| old.len() as u64).unwrap_or(0);

        // Check capacity
        if self.max_capacity > 0 {
            let current = self.bytes_used.load(Ordering::SeqCst) - replaced;
            if current + data_len > self.max_capacity {
                return Err(FarmError::Storage(format!(
                    "no space left: {} / {} bytes",
                    current, self.max_capacity
                )));
            }
        }

        shards.insert(height, data);
        self.bytes_used.fetch_sub(replaced, Ordering::SeqCst);
        self.bytes_used.fetch_add(data_len, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }

    fn get(&self, height: u64) -> Result<Option<Bytes>> {
        Ok(self.shards.read().get(&height).cloned())
    }

    fn size_of(&self, height: u64) -> Result<Option<u64>> {
        Ok(self.shards.read().get(&height).map(|d| d.len() as u64))
    }

    fn heights(&self) -> Result<Vec<u64>> {
        Ok(self.shards.read().keys().copied().collect())
    }

    fn clear(&self) -> Result<usize> {
        let mut shards = self.shards.write();
        let removed = shards.len();
        shards.clear();
        self.bytes_used.store(0, Ordering::SeqCst);
        self.deletes.fetch_add(removed as u64, Ordering::Relaxed);
        Ok(removed)
    }

    fn stats(&self) -> Result<StorageStats> {
        let shards = self.shards.read();
        Ok(StorageStats {
            shard_count: shards.len() as u64,
            bytes_used: self.bytes_used.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let store = MemoryShardStore::new();
        let data = Bytes::from_static(b"hello world");

        store.put(1, data.clone()).unwrap();
        assert_eq!(store.get(1).unwrap().unwrap(), data);
        assert_eq!(store.size_of(1).unwrap(), Some(11));
        assert_eq!(store.get(2).unwrap(), None);
    }

    #[test]
    fn test_capacity_limit() {
        let store = MemoryShardStore::with_capacity(100);

        store.put(1, Bytes::from(vec![0u8; 50])).unwrap();
        store.put(2, Bytes::from(vec![0u8; 50])).unwrap();

        // Replacing in place fits
        store.put(2, Bytes::from(vec![1u8; 50])).unwrap();

        let result = store.put(3, Bytes::from(vec![0u8; 1]));
        assert!(matches!(result, Err(FarmError::Storage(_))));
    }

    #[test]
    fn test_clear_and_stats() {
        let store = MemoryShardStore::new();
        for height in 1..=3 {
            store.put(height, Bytes::from(vec![0u8; 10])).unwrap();
        }
        assert_eq!(store.heights().unwrap(), vec![1, 2, 3]);

        let stats = store.stats().unwrap();
        assert_eq!(stats.shard_count, 3);
        assert_eq!(stats.bytes_used, 30);
        assert_eq!(stats.writes, 3);

        assert_eq!(store.clear().unwrap(), 3);
        assert_eq!(store.clear().unwrap(), 0);
        let stats = store.stats().unwrap();
        assert_eq!(stats.bytes_used, 0);
        assert_eq!(stats.deletes, 3);
    }
}
