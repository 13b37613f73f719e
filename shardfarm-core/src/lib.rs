//! shardfarm Core Library
//!
//! Core abstractions for the shardfarm proof-of-storage client.
//! This crate provides:
//! - Deterministic shard derivation from a farmer identity
//! - Payout address and wallet validation
//! - Checkpoint policy and settled-height tracking
//! - Retry policy and common error handling

pub mod checkpoint;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod retry;
pub mod shard;

pub use checkpoint::{CheckpointPolicy, SettledHeight};
pub use crypto::ContentHash;
pub use error::{FarmError, Result};
pub use identity::{Identity, PayoutAddress, WalletRef};
pub use retry::{RetryLimit, RetryPolicy};
pub use shard::{Capacity, ShardGenerator};

/// Default remote authority
pub const DEFAULT_URL: &str = "http://status.driveshare.org";

/// Size constants
pub const SHARD_SIZE: u64 = 128 * 1024 * 1024; // 128 MB
pub const DEFAULT_MAX_SIZE: u64 = 1024 * 1024 * 1024; // 1 GB

/// Build defaults
pub const DEFAULT_SET_HEIGHT_INTERVAL: u64 = 25;
pub const DEFAULT_WORKERS: usize = 1;

/// Seconds between keep-alive pings
pub const DEFAULT_POLL_DELAY_SECS: u64 = 15;

/// Connection retry defaults (120 * 30 sec = 1 hour)
pub const DEFAULT_RETRY_LIMIT: u32 = 120;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 30;
