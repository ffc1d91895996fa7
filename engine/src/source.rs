//! Seams to the engine's external collaborators: the initial-snapshot
//! source and the push-based stream transport. Concrete implementations
//! live in the `feed` crate; tests use in-process mocks.

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

use crate::types::{MarketEntity, Tick};

/// Initial-snapshot source: supplies up to `count` entity records.
///
/// Failures surface to the caller as an error state; the engine proceeds
/// with whatever entities already exist (possibly none). Retry/backoff is
/// the implementation's business, not the engine's.
#[async_trait]
pub trait BaselineSource: Send + Sync {
    async fn fetch(&self, count: usize) -> anyhow::Result<Vec<MarketEntity>>;
}

/// Push-based tick stream for a subscribed symbol set.
///
/// `subscribe` starts delivery into `sender` and returns a cancel handle.
/// Delivery order is the transport's arrival order; the engine applies
/// ticks exactly as received. Implementations own reconnection; on a
/// disconnect the engine simply observes a silent gap and resumes with
/// current-state-only semantics once frames flow again.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn subscribe(&self, symbols: &[String], sender: Sender<Tick>) -> anyhow::Result<FeedHandle>;
}

/// Cancel handle for an active subscription.
pub struct FeedHandle {
    task: JoinHandle<()>,
}

impl FeedHandle {
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    /// Stop the delivery task. Ticks already sitting in the channel are
    /// discarded by a stopped session, never applied.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
