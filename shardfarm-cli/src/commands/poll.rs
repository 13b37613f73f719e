//! Poll Command
//!
//! Keeps the farmer marked alive until the limit passes or Ctrl-C.

use super::Orchestrator;
use crate::symbols;
use anyhow::Result;
use console::style;
use shardfarm_core::PayoutAddress;
use shardfarm_node::{PollOptions, PollOutcome};
use std::time::Duration;

/// Poll configuration
pub struct PollConfig {
    /// Seconds between pings
    pub delay_secs: u64,
    /// Stop after this many seconds
    pub limit_secs: Option<u64>,
    /// Register before polling
    pub register_address: Option<PayoutAddress>,
}

impl PollConfig {
    pub fn options(self) -> PollOptions {
        PollOptions {
            delay: Duration::from_secs(self.delay_secs),
            limit: self.limit_secs.map(Duration::from_secs),
            register_address: self.register_address,
        }
    }
}

pub async fn run(farm: &mut Orchestrator, config: PollConfig) -> Result<()> {
    let outcome = farm.poll(&config.options()).await?;
    print_outcome(&outcome);
    Ok(())
}

pub fn print_outcome(outcome: &PollOutcome) {
    match outcome {
        PollOutcome::DeadlineReached { pings } => println!(
            "{} Poll limit reached after {} pings",
            style(symbols::CHECK).green(),
            pings
        ),
        PollOutcome::Cancelled { pings } => println!(
            "{} Polling stopped after {} pings",
            style(symbols::WARN).yellow(),
            pings
        ),
    }
}
