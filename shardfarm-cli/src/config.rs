//! Configuration file handling
//!
//! Config directory: ~/.shardfarm/ (cross-platform)
//!
//! The first run writes `config.toml` with a freshly generated wallet whose
//! authentication address doubles as the payout address.

use anyhow::{Context, Result};
use shardfarm_node::config::{default_home, FarmerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Get the config directory path (~/.shardfarm/)
pub fn config_dir() -> Result<PathBuf> {
    let config_dir = default_home();

    // Create directory if it doesn't exist
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create {}", config_dir.display()))?;
    }

    Ok(config_dir)
}

/// Get the config file path, honoring an explicit override
pub fn config_file_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(config_dir()?.join("config.toml")),
    }
}

/// Load the config file, creating it on first run
pub fn load_or_init(path: &Path) -> Result<FarmerConfig> {
    if path.exists() {
        return FarmerConfig::from_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()));
    }

    let config = FarmerConfig::initialize();
    save_config(path, &config)?;
    info!(path = %path.display(), "Created config with a new wallet");
    Ok(config)
}

/// Save configuration to file (owner-only on Unix)
pub fn save_config(path: &Path, config: &FarmerConfig) -> Result<()> {
    config
        .save(path)
        .with_context(|| format!("Failed to write config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_run_creates_wallet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let created = load_or_init(&path).unwrap();
        assert!(path.exists());
        assert!(created.farmer.wallet.is_some());
        assert_eq!(
            created.payout_address().unwrap(),
            created.auth_address().unwrap()
        );

        // Second run loads the same identity
        let loaded = load_or_init(&path).unwrap();
        assert_eq!(loaded, created);
    }

    #[cfg(unix)]
    #[test]
    fn test_first_run_config_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        load_or_init(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[farmer]\npayout_address = \"nope\"\n").unwrap();

        assert!(load_or_init(&path).is_err());
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = PathBuf::from("/tmp/custom.toml");
        assert_eq!(config_file_path(Some(path.as_path())).unwrap(), path);
    }
}
