//! Keep-alive polling
//!
//! Pings the authority every `delay` until a deadline passes or the
//! cancellation token fires. Cancellation is only observed between
//! iterations, so neither a ping nor the sleep after it is cut short.

use crate::authority::Authority;
use crate::client::ResilientClient;
use shardfarm_core::error::Result;
use shardfarm_core::{PayoutAddress, DEFAULT_POLL_DELAY_SECS};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Pause between pings
    pub delay: Duration,
    /// Stop once this much time has passed; `None` polls until cancelled
    pub limit: Option<Duration>,
    /// Register this address before the first ping
    pub register_address: Option<PayoutAddress>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(DEFAULT_POLL_DELAY_SECS),
            limit: None,
            register_address: None,
        }
    }
}

/// Why polling stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    DeadlineReached { pings: u64 },
    Cancelled { pings: u64 },
}

impl PollOutcome {
    pub fn pings(&self) -> u64 {
        match self {
            PollOutcome::DeadlineReached { pings } | PollOutcome::Cancelled { pings } => *pings,
        }
    }
}

pub struct PollScheduler<'a, A> {
    client: &'a ResilientClient<A>,
    cancel: CancellationToken,
}

impl<'a, A: Authority> PollScheduler<'a, A> {
    pub fn new(client: &'a ResilientClient<A>, cancel: CancellationToken) -> Self {
        Self { client, cancel }
    }

    pub async fn run(&self, options: &PollOptions) -> Result<PollOutcome> {
        if let Some(address) = &options.register_address {
            match self.client.register(address).await {
                Ok(()) => info!(payout = %address, "Registered"),
                Err(e) if e.is_already_registered() => {
                    debug!(payout = %address, "Already registered")
                }
                Err(e) => return Err(e),
            }
        }

        // A limit too large to represent polls forever
        let deadline = options
            .limit
            .and_then(|limit| Instant::now().checked_add(limit));
        let mut pings = 0;

        info!(
            delay_secs = options.delay.as_secs(),
            limit_secs = options.limit.map(|l| l.as_secs()),
            "Polling"
        );

        loop {
            self.client.ping().await?;
            pings += 1;
            debug!(pings, "Ping sent");

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                info!(pings, "Poll limit reached");
                return Ok(PollOutcome::DeadlineReached { pings });
            }

            tokio::time::sleep(options.delay).await;

            if self.cancel.is_cancelled() {
                info!(pings, "Polling cancelled");
                return Ok(PollOutcome::Cancelled { pings });
            }
        }
    }
}
