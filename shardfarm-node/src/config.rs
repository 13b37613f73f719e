//! Configuration management for the farming client
//!
//! Supports loading from TOML files and environment variables.
//!
//! ```toml
//! [farmer]
//! payout_address = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"
//! wallet = "..."
//!
//! [server]
//! url = "http://status.driveshare.org"
//! retry_limit = 120
//! retry_delay_secs = 30
//!
//! [build]
//! store_path = "/home/farmer/.shardfarm/store"
//! max_size = 1073741824
//! shard_size = 134217728
//! set_height_interval = 25
//! workers = 1
//!
//! [poll]
//! delay_secs = 15
//! ```

use crate::builder::BuildOptions;
use serde::{Deserialize, Serialize};
use shardfarm_core::error::FarmError;
use shardfarm_core::{
    Capacity, PayoutAddress, RetryPolicy, WalletRef, DEFAULT_MAX_SIZE, DEFAULT_POLL_DELAY_SECS,
    DEFAULT_RETRY_DELAY_SECS, DEFAULT_RETRY_LIMIT, DEFAULT_SET_HEIGHT_INTERVAL, DEFAULT_URL,
    DEFAULT_WORKERS, SHARD_SIZE,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the per-user directory under the home directory
pub const HOME_DIR_NAME: &str = ".shardfarm";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for FarmError {
    fn from(e: ConfigError) -> Self {
        FarmError::Config(e.to_string())
    }
}

/// Complete farmer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FarmerConfig {
    #[serde(default)]
    pub farmer: FarmerSettings,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub build: BuildSettings,

    #[serde(default)]
    pub poll: PollSettings,
}

impl FarmerConfig {
    /// Fresh configuration with a new wallet paying out to its own address
    pub fn initialize() -> Self {
        let wallet = WalletRef::generate();
        let mut config = Self::default();
        config.farmer.payout_address = Some(wallet.auth_address().to_string());
        config.farmer.wallet = Some(wallet.as_str().to_string());
        config
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: FarmerConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration, creating parent directories as needed.
    ///
    /// The file holds the wallet secret, so on Unix it is owner-only from
    /// the moment it is created.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        let tmp = path.with_extension("toml.tmp");

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp)?;

        // A stale temp file keeps its old mode
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(address) = &self.farmer.payout_address {
            PayoutAddress::parse(address)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }
        if let Some(wallet) = &self.farmer.wallet {
            WalletRef::parse(wallet).map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }

        if self.server.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server url cannot be empty".to_string(),
            ));
        }

        if self.build.set_height_interval == 0 {
            return Err(ConfigError::ValidationError(
                "set_height_interval must be at least 1".to_string(),
            ));
        }

        if self.build.workers == 0 {
            return Err(ConfigError::ValidationError(
                "workers must be at least 1".to_string(),
            ));
        }

        self.capacity()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("SHARDFARM_URL") {
            self.server.url = url;
        }

        if let Ok(path) = std::env::var("SHARDFARM_STORE_PATH") {
            self.build.store_path = PathBuf::from(path);
        }

        if let Ok(size) = std::env::var("SHARDFARM_MAX_SIZE") {
            match parse_byte_size(&size) {
                Ok(bytes) => self.build.max_size = bytes,
                Err(e) => tracing::warn!(value = %size, error = %e, "Ignoring SHARDFARM_MAX_SIZE"),
            }
        }

        self
    }

    /// Configured payout address
    pub fn payout_address(&self) -> Result<PayoutAddress, FarmError> {
        match &self.farmer.payout_address {
            Some(address) => PayoutAddress::parse(address),
            None => Err(FarmError::Config("no payout address configured".to_string())),
        }
    }

    /// Configured wallet
    pub fn wallet(&self) -> Result<WalletRef, FarmError> {
        match &self.farmer.wallet {
            Some(wallet) => WalletRef::parse(wallet),
            None => Err(FarmError::Config("no wallet configured".to_string())),
        }
    }

    /// Address the farmer authenticates as
    pub fn auth_address(&self) -> Result<PayoutAddress, FarmError> {
        Ok(self.wallet()?.auth_address())
    }

    pub fn capacity(&self) -> Result<Capacity, FarmError> {
        Capacity::new(self.build.max_size, self.build.shard_size)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::bounded(
            self.server.retry_limit,
            Duration::from_secs(self.server.retry_delay_secs),
        )
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            set_height_interval: self.build.set_height_interval,
            workers: self.build.workers,
            ..Default::default()
        }
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_secs(self.poll.delay_secs)
    }
}

/// Farmer identity
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FarmerSettings {
    /// Address that receives payouts
    #[serde(default)]
    pub payout_address: Option<String>,

    /// Base58 wallet secret the authentication address is derived from
    #[serde(default)]
    pub wallet: Option<String>,
}

/// Remote authority settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    #[serde(default = "default_url")]
    pub url: String,

    /// Attempts per call in one-shot commands
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: default_url(),
            retry_limit: default_retry_limit(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_retry_limit() -> u32 {
    DEFAULT_RETRY_LIMIT
}

fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_SECS
}

/// Shard build settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildSettings {
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Committed capacity in bytes
    #[serde(default = "default_max_size")]
    pub max_size: u64,

    #[serde(default = "default_shard_size")]
    pub shard_size: u64,

    #[serde(default = "default_set_height_interval")]
    pub set_height_interval: u64,

    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            max_size: default_max_size(),
            shard_size: default_shard_size(),
            set_height_interval: default_set_height_interval(),
            workers: default_workers(),
        }
    }
}

/// `~/.shardfarm`, or `./.shardfarm` when there is no home directory
pub fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(HOME_DIR_NAME)
}

fn default_store_path() -> PathBuf {
    default_home().join("store")
}

fn default_max_size() -> u64 {
    DEFAULT_MAX_SIZE
}

fn default_shard_size() -> u64 {
    SHARD_SIZE
}

fn default_set_height_interval() -> u64 {
    DEFAULT_SET_HEIGHT_INTERVAL
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

/// Keep-alive settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollSettings {
    #[serde(default = "default_poll_delay")]
    pub delay_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            delay_secs: default_poll_delay(),
        }
    }
}

fn default_poll_delay() -> u64 {
    DEFAULT_POLL_DELAY_SECS
}

/// Parse a byte count such as `1073741824`, `512M` or `2G`.
///
/// Suffixes are binary (`K` = 1024) and case-insensitive; a trailing `B`
/// or `iB` is accepted.
pub fn parse_byte_size(input: &str) -> Result<u64, FarmError> {
    let s = input.trim();
    let invalid = || FarmError::InvalidInput(format!("invalid byte size: {:?}", input));

    let upper = s.to_ascii_uppercase();
    let unit = upper
        .strip_suffix("IB")
        .or_else(|| upper.strip_suffix('B'))
        .unwrap_or(upper.as_str());

    let (digits, shift) = match unit.chars().last() {
        Some('K') => (&unit[..unit.len() - 1], 10),
        Some('M') => (&unit[..unit.len() - 1], 20),
        Some('G') => (&unit[..unit.len() - 1], 30),
        Some('T') => (&unit[..unit.len() - 1], 40),
        _ => (unit, 0),
    };

    let value: u64 = digits.trim().parse().map_err(|_| invalid())?;
    value.checked_mul(1u64 << shift).ok_or_else(invalid)
}
