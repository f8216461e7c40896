//! Background removal of expired tokens.
//!
//! The gate only enqueues; a single worker task drains the queue and calls
//! `TokenStore::remove`. Failures are logged and dropped.
//!
//! The queue is bounded. When it is full the job is dropped: the token stays
//! expired in the store and is queued again on its next lookup.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::repos::TokenStore;
use crate::services::auth::gate::token_fingerprint;

const QUEUE_CAPACITY: usize = 1024;

/// A token found expired during lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredToken {
    pub access_token: String,
    pub client_id: String,
}

/// Sending side of the cleanup queue. Cheap to clone.
#[derive(Clone, Debug)]
pub struct CleanupQueue {
    tx: mpsc::Sender<ExpiredToken>,
}

impl CleanupQueue {
    /// Build a queue without a worker. The caller owns the receiving side.
    pub fn channel() -> (Self, mpsc::Receiver<ExpiredToken>) {
        Self::with_capacity(QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<ExpiredToken>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Fire-and-forget: never blocks, never fails the caller.
    pub fn enqueue(&self, job: ExpiredToken) {
        match self.tx.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => tracing::debug!(
                token = %token_fingerprint(&job.access_token),
                "cleanup queue is full; dropping removal job"
            ),
            Err(TrySendError::Closed(job)) => tracing::warn!(
                token = %token_fingerprint(&job.access_token),
                "cleanup worker is gone; expired token left in store"
            ),
        }
    }
}

/// Spawn the cleanup worker. Call this once at startup.
///
/// The worker stops when every `CleanupQueue` clone has been dropped.
pub fn spawn(store: Arc<dyn TokenStore>) -> (CleanupQueue, JoinHandle<()>) {
    let (queue, rx) = CleanupQueue::channel();
    let handle = tokio::spawn(run(store, rx));
    (queue, handle)
}

async fn run(store: Arc<dyn TokenStore>, mut rx: mpsc::Receiver<ExpiredToken>) {
    while let Some(job) = rx.recv().await {
        match store.remove(&job.access_token, &job.client_id).await {
            Ok(removed) => tracing::debug!(
                token = %token_fingerprint(&job.access_token),
                client_id = %job.client_id,
                removed,
                "expired access token removed"
            ),
            Err(err) => tracing::warn!(
                error = %err,
                token = %token_fingerprint(&job.access_token),
                client_id = %job.client_id,
                backend = store.backend_name(),
                "failed to remove expired access token"
            ),
        }
    }
}
