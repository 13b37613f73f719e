//! Farm Command
//!
//! Register, build and poll without giving up on the network.

use super::{build, poll, Orchestrator};
use crate::symbols;
use anyhow::Result;
use console::style;
use shardfarm_node::{BuildOptions, PollOptions};

pub async fn run(
    farm: &mut Orchestrator,
    build_options: BuildOptions,
    poll_options: PollOptions,
) -> Result<()> {
    let report = farm.farm(&build_options, &poll_options).await?;

    if report.newly_registered {
        println!("{} Registered", style(symbols::CHECK).green());
    }
    build::print_summary(&report.build, farm.engine().generator().shard_size() as u64);
    poll::print_outcome(&report.poll);
    Ok(())
}
