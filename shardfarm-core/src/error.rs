//! Error types for shardfarm
//!
//! Provides a unified error type for all shardfarm operations, grouped by the
//! way callers are expected to react to them.

use thiserror::Error;

/// Result type alias for shardfarm operations
pub type Result<T> = std::result::Result<T, FarmError>;

/// Unified error type for shardfarm
#[derive(Error, Debug)]
pub enum FarmError {
    // ===== Validation Errors =====
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid wallet reference: {0}")]
    InvalidWallet(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid capacity: max_size={max_size}, shard_size={shard_size}")]
    InvalidCapacity { max_size: u64, shard_size: u64 },

    // ===== Registration =====
    #[error("Address already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    // ===== Network Errors =====
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("Connection exhausted: {operation} failed after {attempts} attempts ({last_error})")]
    ConnectionExhausted {
        operation: &'static str,
        attempts: u64,
        last_error: String,
    },

    // ===== Storage Errors =====
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Build failed at height {height}: {reason}")]
    BuildFailure { height: u64, reason: String },

    // ===== I/O Errors =====
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ===== Configuration Errors =====
    #[error("Configuration error: {0}")]
    Config(String),

    // ===== Generic Errors =====
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FarmError {
    /// Whether retrying the same operation may succeed.
    ///
    /// Only transient network conditions qualify. Validation, storage and
    /// server rejections are structural and never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FarmError::Transport(_) | FarmError::RegistrationFailed(_))
    }

    /// Whether the server reported an idempotent no-op registration
    pub fn is_already_registered(&self) -> bool {
        matches!(self, FarmError::AlreadyRegistered(_))
    }
}
