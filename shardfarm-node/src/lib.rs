//! shardfarm Node Library
//!
//! Provides the farming client:
//! - `BuildEngine` for parallel, resumable shard generation
//! - `ResilientClient` for retrying calls to the remote authority
//! - `PollScheduler` for keep-alive pings
//! - `FarmOrchestrator` for the Register -> Build -> Poll sequence
//! - Configuration management and metrics

pub mod authority;
pub mod builder;
pub mod checkpoint;
pub mod client;
pub mod config;
pub mod farm;
pub mod metrics;
pub mod poll;

pub use authority::{Authority, HttpAuthority};
pub use builder::{BuildEngine, BuildOptions, BuildSummary, ShardOutcome};
pub use checkpoint::{CheckpointSink, NullSink, ReportingSink};
pub use client::ResilientClient;
pub use config::{parse_byte_size, ConfigError, FarmerConfig};
pub use farm::{FarmOrchestrator, FarmReport, FarmState};
pub use metrics::init_metrics;
pub use poll::{PollOptions, PollOutcome, PollScheduler};
