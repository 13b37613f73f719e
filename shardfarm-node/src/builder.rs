//! Shard build engine
//!
//! Generates every height in `1..=total_height` on a bounded pool of
//! blocking workers. Completions arrive in any order; a single collector
//! folds them into the settled height and feeds qualifying checkpoints to
//! the sink strictly in increasing order.
//!
//! Progress is whatever is on disk. A second build with `rebuild = false`
//! reuses every well-formed shard and only fills the gaps.

use crate::checkpoint::CheckpointSink;
use crate::metrics::names;
use metrics::{counter, gauge};
use shardfarm_core::error::{FarmError, Result};
use shardfarm_core::{
    Capacity, CheckpointPolicy, Identity, SettledHeight, ShardGenerator,
    DEFAULT_SET_HEIGHT_INTERVAL, DEFAULT_WORKERS,
};
use shardfarm_storage::{inspect, IntegrityCheck, ShardState, ShardStore, StorageStats};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

/// Options for a single build run
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Remove all shard artifacts before building
    pub cleanup: bool,
    /// Regenerate shards even if they look valid
    pub rebuild: bool,
    /// Report every n-th height (plus the first and last)
    pub set_height_interval: u64,
    /// Maximum shards generated concurrently
    pub workers: usize,
    /// How existing shards are checked before reuse
    pub integrity: IntegrityCheck,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            cleanup: false,
            rebuild: false,
            set_height_interval: DEFAULT_SET_HEIGHT_INTERVAL,
            workers: DEFAULT_WORKERS,
            integrity: IntegrityCheck::Size,
        }
    }
}

/// What happened to one height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardOutcome {
    Generated,
    Reused,
}

/// Result of a completed build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub total_height: u64,
    pub generated: u64,
    pub reused: u64,
    /// Heights delivered to the sink, in delivery order
    pub checkpoints: Vec<u64>,
    /// Store contents once the build finished
    pub stored: StorageStats,
}

impl BuildSummary {
    /// Total heights processed
    pub fn processed(&self) -> u64 {
        self.generated + self.reused
    }
}

pub struct BuildEngine<S> {
    generator: ShardGenerator,
    total_height: u64,
    store: Arc<S>,
}

impl<S: ShardStore + 'static> BuildEngine<S> {
    pub fn new(identity: Identity, capacity: &Capacity, store: Arc<S>) -> Self {
        Self {
            generator: ShardGenerator::new(identity, capacity),
            total_height: capacity.total_height(),
            store,
        }
    }

    pub fn generator(&self) -> &ShardGenerator {
        &self.generator
    }

    pub fn total_height(&self) -> u64 {
        self.total_height
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run a build, delivering checkpoints to `sink`
    #[instrument(skip(self, options, sink), fields(total_height = self.total_height))]
    pub async fn build<K>(&self, options: &BuildOptions, sink: &mut K) -> Result<BuildSummary>
    where
        K: CheckpointSink + ?Sized,
    {
        if options.workers == 0 {
            return Err(FarmError::InvalidInput("workers must be at least 1".into()));
        }
        let policy = CheckpointPolicy::new(options.set_height_interval, self.total_height)?;
        let start = Instant::now();

        if options.cleanup {
            let store = Arc::clone(&self.store);
            let removed = tokio::task::spawn_blocking(move || store.clear())
                .await
                .map_err(|e| FarmError::Internal(format!("cleanup task failed: {}", e)))??;
            info!(removed, "Cleaned shard store");
        }

        info!(
            workers = options.workers,
            interval = options.set_height_interval,
            rebuild = options.rebuild,
            "Starting build"
        );

        let mut summary = BuildSummary {
            total_height: self.total_height,
            ..Default::default()
        };
        let mut settled = SettledHeight::new();
        let mut jobs = JoinSet::new();
        let mut next_height = 1;
        let mut failure: Option<FarmError> = None;

        loop {
            // Keep the pool full until something fails
            while failure.is_none()
                && jobs.len() < options.workers
                && next_height <= self.total_height
            {
                let height = next_height;
                let store = Arc::clone(&self.store);
                let generator = self.generator.clone();
                let rebuild = options.rebuild;
                let integrity = options.integrity;

                jobs.spawn_blocking(move || {
                    let outcome =
                        process_height(store.as_ref(), &generator, height, rebuild, integrity);
                    (height, outcome)
                });
                next_height += 1;
            }

            let Some(joined) = jobs.join_next().await else {
                break;
            };

            let (height, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    error!(error = %e, "Shard worker panicked");
                    failure.get_or_insert(FarmError::Internal(format!("worker failed: {}", e)));
                    continue;
                }
            };

            match outcome {
                Ok(ShardOutcome::Generated) => {
                    summary.generated += 1;
                    counter!(names::SHARDS_GENERATED).increment(1);
                }
                Ok(ShardOutcome::Reused) => {
                    summary.reused += 1;
                    counter!(names::SHARDS_REUSED).increment(1);
                }
                Err(e) => {
                    warn!(height, error = %e, "Shard write failed, draining workers");
                    failure.get_or_insert(FarmError::BuildFailure {
                        height,
                        reason: e.to_string(),
                    });
                    continue;
                }
            }

            if failure.is_some() {
                continue;
            }

            for height in settled.complete(height) {
                gauge!(names::SETTLED_HEIGHT).set(height as f64);
                if !policy.should_report(height) {
                    continue;
                }
                if let Err(e) = sink.checkpoint(height).await {
                    warn!(height, error = %e, "Checkpoint failed, draining workers");
                    failure = Some(e);
                    break;
                }
                counter!(names::CHECKPOINTS).increment(1);
                summary.checkpoints.push(height);
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        let store = Arc::clone(&self.store);
        summary.stored = tokio::task::spawn_blocking(move || store.stats())
            .await
            .map_err(|e| FarmError::Internal(format!("stats task failed: {}", e)))??;

        info!(
            generated = summary.generated,
            reused = summary.reused,
            checkpoints = summary.checkpoints.len(),
            stored_bytes = summary.stored.bytes_used,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Build complete"
        );

        Ok(summary)
    }
}

/// Reuse the shard at `height` if allowed and well-formed, otherwise write it
fn process_height<S: ShardStore + ?Sized>(
    store: &S,
    generator: &ShardGenerator,
    height: u64,
    rebuild: bool,
    integrity: IntegrityCheck,
) -> Result<ShardOutcome> {
    if !rebuild {
        match inspect(store, generator, height, integrity)? {
            ShardState::Valid => return Ok(ShardOutcome::Reused),
            ShardState::Malformed(reason) => {
                debug!(height, reason = %reason, "Regenerating malformed shard");
            }
            ShardState::Missing => {}
        }
    }

    store.put(height, generator.generate(height))?;
    Ok(ShardOutcome::Generated)
}
