//! Filesystem shard store
//!
//! One file per height inside a single directory. Writes go to a uniquely
//! named temp file which is fsynced and renamed into place, so a crash never
//! leaves a full-length file with partial content under a shard name.

use crate::backend::{ShardStore, StorageStats};
use crate::{parse_shard_file_name, shard_file_name, TEMP_PREFIX};
use bytes::Bytes;
use shardfarm_core::error::{FarmError, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;

/// Shard store rooted at a directory
pub struct FsShardStore {
    root: PathBuf,
    writes: AtomicU64,
    deletes: AtomicU64,
}

impl FsShardStore {
    /// Open a store, creating the directory if needed
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            FarmError::Storage(format!("cannot create {}: {}", root.display(), e))
        })?;

        debug!(path = %root.display(), "Opened shard store");

        Ok(Self {
            root,
            writes: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
        })
    }

    /// Store directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of the shard file for `height`
    pub fn shard_path(&self, height: u64) -> PathBuf {
        self.root.join(shard_file_name(height))
    }

    fn entries(&self) -> Result<Vec<fs::DirEntry>> {
        match fs::read_dir(&self.root) {
            Ok(iter) => Ok(iter.collect::<std::io::Result<Vec<_>>>()?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl ShardStore for FsShardStore {
    fn put(&self, height: u64, data: Bytes) -> Result<()> {
        let path = self.shard_path(height);
        let temp_path = self.root.join(format!("{}{}", TEMP_PREFIX, Uuid::new_v4()));

        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(&data)?;
            file.sync_all()?;
            fs::rename(&temp_path, &path)
        };

        if let Err(e) = write() {
            let _ = fs::remove_file(&temp_path);
            return Err(FarmError::Storage(format!(
                "write {} failed: {}",
                path.display(),
                e
            )));
        }

        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn get(&self, height: u64) -> Result<Option<Bytes>> {
        match fs::read(self.shard_path(height)) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn size_of(&self, height: u64) -> Result<Option<u64>> {
        match fs::metadata(self.shard_path(height)) {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            // A directory squatting on a shard name is not a shard
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn heights(&self) -> Result<Vec<u64>> {
        let mut heights: Vec<u64> = self
            .entries()?
            .iter()
            .filter_map(|entry| entry.file_name().to_str().and_then(parse_shard_file_name))
            .collect();
        heights.sort_unstable();
        Ok(heights)
    }

    fn clear(&self) -> Result<usize> {
        let mut removed = 0;

        for entry in self.entries()? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if parse_shard_file_name(name).is_none() && !name.starts_with(TEMP_PREFIX) {
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(file = %name, error = %e, "Failed to remove shard artifact");
                    return Err(e.into());
                }
            }
        }

        self.deletes.fetch_add(removed as u64, Ordering::Relaxed);
        debug!(path = %self.root.display(), removed, "Cleared shard store");
        Ok(removed)
    }

    fn stats(&self) -> Result<StorageStats> {
        let mut shard_count = 0;
        let mut bytes_used = 0;

        for height in self.heights()? {
            if let Some(size) = self.size_of(height)? {
                shard_count += 1;
                bytes_used += size;
            }
        }

        Ok(StorageStats {
            shard_count,
            bytes_used,
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        })
    }
}
