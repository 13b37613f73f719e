//! Checkpoint sinks
//!
//! The build engine hands every qualifying settled height to a
//! [`CheckpointSink`], in increasing order and one at a time. An error from
//! the sink aborts the build.

use crate::authority::Authority;
use crate::client::ResilientClient;
use shardfarm_core::error::{FarmError, Result};
use tokio::sync::mpsc;
use tracing::info;

#[async_trait::async_trait]
pub trait CheckpointSink: Send {
    async fn checkpoint(&mut self, height: u64) -> Result<()>;
}

/// Reports each checkpoint to the authority
pub struct ReportingSink<'a, A> {
    client: &'a ResilientClient<A>,
}

impl<'a, A: Authority> ReportingSink<'a, A> {
    pub fn new(client: &'a ResilientClient<A>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl<A: Authority> CheckpointSink for ReportingSink<'_, A> {
    async fn checkpoint(&mut self, height: u64) -> Result<()> {
        self.client.report_height(height).await?;
        info!(height, "Reported height");
        Ok(())
    }
}

/// Forwards checkpoints to a channel
#[async_trait::async_trait]
impl CheckpointSink for mpsc::Sender<u64> {
    async fn checkpoint(&mut self, height: u64) -> Result<()> {
        self.send(height)
            .await
            .map_err(|_| FarmError::Internal("checkpoint receiver dropped".to_string()))
    }
}

/// Discards checkpoints
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait::async_trait]
impl CheckpointSink for NullSink {
    async fn checkpoint(&mut self, _height: u64) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink() {
        let (mut tx, mut rx) = mpsc::channel(4);
        tx.checkpoint(1).await.unwrap();
        tx.checkpoint(4).await.unwrap();
        drop(tx);

        let mut got = Vec::new();
        while let Some(h) = rx.recv().await {
            got.push(h);
        }
        assert_eq!(got, vec![1, 4]);
    }

    #[tokio::test]
    async fn test_channel_sink_closed() {
        let (mut tx, rx) = mpsc::channel(1);
        drop(rx);
        assert!(matches!(
            tx.checkpoint(1).await,
            Err(FarmError::Internal(_))
        ));
    }
}
