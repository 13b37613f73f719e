//! Ping Command

use super::Orchestrator;
use crate::symbols;
use anyhow::Result;
use console::style;

pub async fn run(farm: &mut Orchestrator) -> Result<()> {
    farm.ping().await?;
    println!("{} Ping acknowledged", style(symbols::CHECK).green());
    Ok(())
}
