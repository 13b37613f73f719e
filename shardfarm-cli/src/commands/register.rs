//! Register Command
//!
//! Registers the configured payout address with the authority.

use super::Orchestrator;
use crate::symbols;
use anyhow::Result;
use console::style;

pub async fn run(farm: &mut Orchestrator) -> Result<()> {
    match farm.register().await {
        Ok(()) => {
            println!("{} Registered", style(symbols::CHECK).green());
            Ok(())
        }
        Err(e) if e.is_already_registered() => {
            println!("{} Address already registered", style(symbols::WARN).yellow());
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
