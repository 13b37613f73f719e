//! Retrying client for the remote authority
//!
//! Wraps an [`Authority`] with one [`RetryPolicy`]. Transient failures are
//! retried after `delay` until the policy runs out of attempts; everything
//! else is returned to the caller unchanged on the first occurrence.

use crate::authority::Authority;
use crate::metrics::names;
use metrics::counter;
use shardfarm_core::error::{FarmError, Result};
use shardfarm_core::{PayoutAddress, RetryPolicy};
use std::future::Future;
use tracing::{debug, warn};

pub struct ResilientClient<A> {
    authority: A,
    policy: RetryPolicy,
}

impl<A: Authority> ResilientClient<A> {
    pub fn new(authority: A, policy: RetryPolicy) -> Self {
        Self { authority, policy }
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: RetryPolicy) {
        self.policy = policy;
    }

    /// Register `payout_address`.
    ///
    /// `AlreadyRegistered` comes back as an error without being retried;
    /// callers that treat it as success must absorb it themselves.
    pub async fn register(&self, payout_address: &PayoutAddress) -> Result<()> {
        self.with_retry("register", || self.authority.register(payout_address))
            .await
    }

    pub async fn ping(&self) -> Result<()> {
        self.with_retry("ping", || self.authority.ping()).await?;
        counter!(names::PINGS).increment(1);
        Ok(())
    }

    pub async fn report_height(&self, height: u64) -> Result<()> {
        self.with_retry("height", || self.authority.report_height(height))
            .await
    }

    /// Run `operation` until it succeeds, fails fatally or the policy is spent
    async fn with_retry<F, Fut, T>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts: u64 = 0;

        loop {
            attempts += 1;

            let err = match call().await {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(operation, attempts, "Operation recovered");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !err.is_retryable() {
                return Err(err);
            }

            if !self.policy.allows_another(attempts) {
                warn!(operation, attempts, error = %err, "Giving up on operation");
                return Err(FarmError::ConnectionExhausted {
                    operation,
                    attempts,
                    last_error: err.to_string(),
                });
            }

            warn!(
                operation,
                attempt = attempts,
                delay_secs = self.policy.delay.as_secs_f64(),
                error = %err,
                "Retrying operation"
            );
            counter!(names::RETRIES, "operation" => operation).increment(1);
            tokio::time::sleep(self.policy.delay).await;
        }
    }
}
