//! shardfarm CLI
//!
//! Command-line farmer for the proof-of-storage network.
//!
//! # Commands
//! - `register` - Register the payout address
//! - `ping` - Send a single keep-alive
//! - `poll` - Keep-alive loop
//! - `build` - Generate the shard set
//! - `farm` - Register, build, then poll indefinitely
//! - `config` - Show or change the farmer identity
//! - `version` - Print the version
//!
//! # Configuration
//! Config file: ~/.shardfarm/config.toml

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use shardfarm_core::{PayoutAddress, WalletRef};
use shardfarm_node::{init_metrics, parse_byte_size, FarmerConfig};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

mod commands;
mod config;
mod symbols;

use commands::{build::BuildConfig, poll::PollConfig};

#[derive(Parser)]
#[command(name = "shardfarm")]
#[command(about = "Proof-of-storage farming client")]
#[command(version)]
struct Cli {
    /// Authority URL (overrides config file)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Config file to use instead of ~/.shardfarm/config.toml
    #[arg(long, global = true, env = "SHARDFARM_CONFIG")]
    config_path: Option<PathBuf>,

    /// Directory holding the shards (overrides config file)
    #[arg(long, global = true)]
    store_path: Option<PathBuf>,

    /// Committed capacity, e.g. 1073741824, 512M or 2G
    #[arg(long, global = true, value_parser = parse_size)]
    max_size: Option<u64>,

    /// Attempts per call before giving up
    #[arg(long, global = true)]
    retry_limit: Option<u32>,

    /// Seconds to wait between attempts
    #[arg(long, global = true)]
    retry_delay: Option<u64>,

    /// Verbose logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the payout address with the authority
    Register,

    /// Send a single keep-alive
    Ping,

    /// Ping the authority periodically
    Poll {
        /// Seconds between pings
        #[arg(long)]
        delay: Option<u64>,

        /// Stop after this many seconds
        #[arg(long)]
        limit: Option<u64>,

        /// Register before polling
        #[arg(long)]
        register_address: bool,
    },

    /// Generate the shard set
    Build {
        /// Remove existing shards first
        #[arg(long)]
        cleanup: bool,

        /// Regenerate shards that already exist
        #[arg(long)]
        rebuild: bool,

        /// Report every n-th height
        #[arg(long)]
        set_height_interval: Option<u64>,

        /// Shards generated in parallel
        #[arg(long, visible_alias = "num-cores")]
        workers: Option<usize>,

        /// Re-hash existing shards before reusing them
        #[arg(long)]
        verify: bool,
    },

    /// Register, build, then poll until interrupted
    Farm,

    /// Show or change the farmer identity
    Config {
        /// Replace the wallet
        #[arg(long)]
        set_wallet: Option<String>,

        /// Replace the payout address
        #[arg(long)]
        set_payout_address: Option<String>,
    },

    /// Print the version
    Version,
}

fn parse_size(s: &str) -> std::result::Result<u64, String> {
    parse_byte_size(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    init_metrics();

    if let Err(e) = run(cli).await {
        error!(error = %format!("{:#}", e), "Command failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Version = cli.command {
        println!("shardfarm {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config_path = config::config_file_path(cli.config_path.as_deref())?;
    let file_config = config::load_or_init(&config_path)?;

    if let Commands::Config {
        set_wallet,
        set_payout_address,
    } = &cli.command
    {
        return handle_config_command(
            &config_path,
            file_config,
            set_wallet.clone(),
            set_payout_address.clone(),
        );
    }

    let config = effective_config(&cli, file_config)?;

    match cli.command {
        Commands::Register => {
            let mut farm = commands::orchestrator(&config, CancellationToken::new())?;
            commands::register(&mut farm).await?;
        }

        Commands::Ping => {
            let mut farm = commands::orchestrator(&config, CancellationToken::new())?;
            commands::ping(&mut farm).await?;
        }

        Commands::Poll {
            delay,
            limit,
            register_address,
        } => {
            let mut farm = commands::orchestrator(&config, shutdown_token())?;
            let poll = PollConfig {
                delay_secs: delay.unwrap_or(config.poll.delay_secs),
                limit_secs: limit,
                register_address: if register_address {
                    Some(config.payout_address()?)
                } else {
                    None
                },
            };
            commands::poll(&mut farm, poll).await?;
        }

        Commands::Build {
            cleanup,
            rebuild,
            set_height_interval,
            workers,
            verify,
        } => {
            let mut farm = commands::orchestrator(&config, CancellationToken::new())?;
            let build = BuildConfig {
                cleanup,
                rebuild,
                set_height_interval: set_height_interval.unwrap_or(config.build.set_height_interval),
                workers: workers.unwrap_or(config.build.workers),
                verify,
            };
            commands::build(&mut farm, build).await?;
        }

        Commands::Farm => {
            let mut farm = commands::orchestrator(&config, shutdown_token())?;
            let poll = PollConfig {
                delay_secs: config.poll.delay_secs,
                limit_secs: None,
                register_address: None,
            };
            commands::farm(&mut farm, config.build_options(), poll.options()).await?;
        }

        // Handled before the config is resolved
        Commands::Config { .. } | Commands::Version => {}
    }

    Ok(())
}

/// File config with environment and command-line overrides applied
fn effective_config(cli: &Cli, file_config: FarmerConfig) -> Result<FarmerConfig> {
    let mut config = file_config.with_env_overrides();

    if let Some(url) = &cli.url {
        config.server.url = url.clone();
    }
    if let Some(path) = &cli.store_path {
        config.build.store_path = path.clone();
    }
    if let Some(size) = cli.max_size {
        config.build.max_size = size;
    }
    if let Some(limit) = cli.retry_limit {
        config.server.retry_limit = limit;
    }
    if let Some(delay) = cli.retry_delay {
        config.server.retry_delay_secs = delay;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Token cancelled by the first Ctrl-C; a second one exits immediately
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Shutdown requested, finishing current step (Ctrl-C again to abort)");
        trigger.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    token
}

/// Show the farmer identity, or validate and store new values
fn handle_config_command(
    path: &Path,
    mut config: FarmerConfig,
    set_wallet: Option<String>,
    set_payout_address: Option<String>,
) -> Result<()> {
    let changed = set_wallet.is_some() || set_payout_address.is_some();

    if let Some(wallet) = set_wallet {
        let wallet = WalletRef::parse(wallet.trim())?;
        config.farmer.wallet = Some(wallet.as_str().to_string());
    }
    if let Some(address) = set_payout_address {
        let address = PayoutAddress::parse(address.trim())?;
        config.farmer.payout_address = Some(address.to_string());
    }
    if changed {
        config::save_config(path, &config)?;
        println!("{} Configuration saved", style(symbols::CHECK).green());
    }

    println!();
    println!("{}", style("Farmer Configuration").bold().underlined());
    println!();
    println!(
        "  Payout address:  {}",
        style(config.farmer.payout_address.as_deref().unwrap_or("(not set)")).cyan()
    );
    match config.auth_address() {
        Ok(auth) => println!("  Auth address:    {}", style(auth).cyan()),
        Err(_) => println!("  Auth address:    {}", style("(no wallet)").yellow()),
    }
    println!("  Server:          {}", config.server.url);
    println!("  Store:           {}", config.build.store_path.display());
    println!(
        "  Capacity:        {}",
        commands::format_bytes(config.build.max_size)
    );
    println!();
    println!("{} {}", style("Config file:").dim(), path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_num_cores_alias() {
        let cli = Cli::try_parse_from(["shardfarm", "build", "--num-cores", "4", "--verify"]).unwrap();
        match cli.command {
            Commands::Build {
                workers, verify, ..
            } => {
                assert_eq!(workers, Some(4));
                assert!(verify);
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::try_parse_from([
            "shardfarm",
            "poll",
            "--limit",
            "60",
            "--max-size",
            "2G",
            "--url",
            "http://localhost:5000",
        ])
        .unwrap();

        assert_eq!(cli.max_size, Some(2 * 1024 * 1024 * 1024));
        let config = effective_config(&cli, FarmerConfig::default()).unwrap();
        assert_eq!(config.server.url, "http://localhost:5000");
        assert_eq!(config.capacity().unwrap().total_height(), 16);
    }

    #[test]
    fn test_bad_size_rejected() {
        assert!(Cli::try_parse_from(["shardfarm", "build", "--max-size", "lots"]).is_err());
    }

    #[test]
    fn test_config_sets_validated_values() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let config = config::load_or_init(&path).unwrap();

        assert!(handle_config_command(&path, config.clone(), None, Some("bogus".into())).is_err());

        handle_config_command(
            &path,
            config,
            None,
            Some("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa".into()),
        )
        .unwrap();
        let saved = FarmerConfig::from_file(&path).unwrap();
        assert_eq!(
            saved.farmer.payout_address.as_deref(),
            Some("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa")
        );
    }
}
