//! Farm orchestration
//!
//! Sequences Register -> Build -> Poll. The one-shot operations run a
//! single phase with the configured retry policy; [`FarmOrchestrator::farm`]
//! chains all three and never gives up on transient network failures.

use crate::authority::Authority;
use crate::builder::{BuildEngine, BuildOptions, BuildSummary};
use crate::checkpoint::ReportingSink;
use crate::client::ResilientClient;
use crate::poll::{PollOptions, PollOutcome, PollScheduler};
use shardfarm_core::error::Result;
use shardfarm_core::PayoutAddress;
use shardfarm_storage::ShardStore;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FarmState {
    Idle,
    Registering,
    Building,
    Polling,
    Terminal,
}

impl fmt::Display for FarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FarmState::Idle => "idle",
            FarmState::Registering => "registering",
            FarmState::Building => "building",
            FarmState::Polling => "polling",
            FarmState::Terminal => "terminal",
        };
        f.write_str(name)
    }
}

/// Outcome of a full farm run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmReport {
    /// False when the address was already registered
    pub newly_registered: bool,
    pub build: BuildSummary,
    pub poll: PollOutcome,
}

pub struct FarmOrchestrator<A, S> {
    client: ResilientClient<A>,
    engine: BuildEngine<S>,
    payout_address: PayoutAddress,
    cancel: CancellationToken,
    state: FarmState,
}

impl<A, S> FarmOrchestrator<A, S>
where
    A: Authority,
    S: ShardStore + 'static,
{
    pub fn new(
        client: ResilientClient<A>,
        engine: BuildEngine<S>,
        payout_address: PayoutAddress,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            engine,
            payout_address,
            cancel,
            state: FarmState::Idle,
        }
    }

    pub fn state(&self) -> FarmState {
        self.state
    }

    pub fn client(&self) -> &ResilientClient<A> {
        &self.client
    }

    pub fn engine(&self) -> &BuildEngine<S> {
        &self.engine
    }

    fn enter(&mut self, next: FarmState) {
        debug!(from = %self.state, to = %next, "Farm state");
        self.state = next;
    }

    /// Register the payout address. `AlreadyRegistered` is an error here.
    pub async fn register(&mut self) -> Result<()> {
        self.enter(FarmState::Registering);
        let result = self.client.register(&self.payout_address).await;
        self.enter(FarmState::Terminal);
        result?;
        info!(payout = %self.payout_address, "Registered");
        Ok(())
    }

    pub async fn ping(&mut self) -> Result<()> {
        let result = self.client.ping().await;
        self.enter(FarmState::Terminal);
        result
    }

    /// Build shards, reporting checkpoints to the authority
    pub async fn build(&mut self, options: &BuildOptions) -> Result<BuildSummary> {
        self.enter(FarmState::Building);
        let mut sink = ReportingSink::new(&self.client);
        let result = self.engine.build(options, &mut sink).await;
        self.enter(FarmState::Terminal);
        result
    }

    pub async fn poll(&mut self, options: &PollOptions) -> Result<PollOutcome> {
        self.enter(FarmState::Polling);
        let result = PollScheduler::new(&self.client, self.cancel.clone())
            .run(options)
            .await;
        self.enter(FarmState::Terminal);
        result
    }

    /// Register (tolerating a prior registration), build, then poll.
    ///
    /// Transient network failures are retried without limit in every
    /// phase. Storage failures abort the run.
    pub async fn farm(
        &mut self,
        build_options: &BuildOptions,
        poll_options: &PollOptions,
    ) -> Result<FarmReport> {
        let configured = self.client.policy();
        self.client.set_policy(configured.into_unbounded());

        let outcome = self.run_phases(build_options, poll_options).await;
        self.client.set_policy(configured);
        self.enter(FarmState::Terminal);
        outcome
    }

    async fn run_phases(
        &mut self,
        build_options: &BuildOptions,
        poll_options: &PollOptions,
    ) -> Result<FarmReport> {
        self.enter(FarmState::Registering);
        let newly_registered = match self.client.register(&self.payout_address).await {
            Ok(()) => {
                info!(payout = %self.payout_address, "Registered");
                true
            }
            Err(e) if e.is_already_registered() => {
                info!(payout = %self.payout_address, "Address already registered");
                false
            }
            Err(e) => return Err(e),
        };

        self.enter(FarmState::Building);
        let mut sink = ReportingSink::new(&self.client);
        let build = self.engine.build(build_options, &mut sink).await?;

        self.enter(FarmState::Polling);
        let poll = PollScheduler::new(&self.client, self.cancel.clone())
            .run(poll_options)
            .await?;

        Ok(FarmReport {
            newly_registered,
            build,
            poll,
        })
    }
}
