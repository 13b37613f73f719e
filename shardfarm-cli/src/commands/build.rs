//! Build Command
//!
//! Generates the shard set, reporting progress to the authority.

use super::{format_bytes, Orchestrator};
use crate::symbols;
use anyhow::Result;
use console::style;
use shardfarm_node::{BuildOptions, BuildSummary};
use shardfarm_storage::IntegrityCheck;

/// Build configuration
pub struct BuildConfig {
    pub cleanup: bool,
    pub rebuild: bool,
    pub set_height_interval: u64,
    pub workers: usize,
    /// Re-hash existing shards before reusing them
    pub verify: bool,
}

impl BuildConfig {
    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            cleanup: self.cleanup,
            rebuild: self.rebuild,
            set_height_interval: self.set_height_interval,
            workers: self.workers,
            integrity: if self.verify {
                IntegrityCheck::Digest
            } else {
                IntegrityCheck::Size
            },
        }
    }
}

pub async fn run(farm: &mut Orchestrator, config: BuildConfig) -> Result<()> {
    let summary = farm.build(&config.options()).await?;
    print_summary(&summary, farm.engine().generator().shard_size() as u64);
    Ok(())
}

pub fn print_summary(summary: &BuildSummary, shard_size: u64) {
    println!(
        "{} Built {} shards ({} generated, {} reused)",
        style(symbols::CHECK).green(),
        style(summary.processed()).cyan(),
        summary.generated,
        summary.reused
    );
    println!(
        "  Capacity:     {}",
        style(format_bytes(summary.total_height * shard_size)).cyan()
    );
    println!(
        "  On disk:      {} in {} shards",
        format_bytes(summary.stored.bytes_used),
        summary.stored.shard_count
    );
    if let Some(last) = summary.checkpoints.last() {
        println!("  Reported:     height {}", last);
    }
}
