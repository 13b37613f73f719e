//! CLI Commands

pub mod build;
pub mod farm;
pub mod ping;
pub mod poll;
pub mod register;

use anyhow::{Context, Result};
use shardfarm_node::{BuildEngine, FarmOrchestrator, FarmerConfig, HttpAuthority, ResilientClient};
use shardfarm_core::Identity;
use shardfarm_storage::FsShardStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use build::run as build;
pub use farm::run as farm;
pub use ping::run as ping;
pub use poll::run as poll;
pub use register::run as register;

pub type Orchestrator = FarmOrchestrator<HttpAuthority, FsShardStore>;

/// Wire the orchestrator from an effective configuration
pub fn orchestrator(config: &FarmerConfig, cancel: CancellationToken) -> Result<Orchestrator> {
    let payout = config.payout_address()?;
    let auth = config.auth_address()?;
    let capacity = config.capacity()?;

    let authority = HttpAuthority::new(&config.server.url, auth)?;
    let client = ResilientClient::new(authority, config.retry_policy());

    let store = FsShardStore::open(&config.build.store_path).with_context(|| {
        format!(
            "Failed to open shard store at {}",
            config.build.store_path.display()
        )
    })?;
    let engine = BuildEngine::new(Identity::from_address(&payout), &capacity, Arc::new(store));

    Ok(FarmOrchestrator::new(client, engine, payout, cancel))
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
