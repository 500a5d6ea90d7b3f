//! Reconciler contract

use async_trait::async_trait;
use mcp_types::ObjectKey;
use std::time::Duration;

/// What to do with a key after a successful pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing more until the next change notification or resync
    Done,

    /// Process the key again after the delay
    RequeueAfter(Duration),
}

/// Idempotent handler for one record key
///
/// Implementations must tolerate being called any number of times for the
/// same key, in any order. A returned error is treated as transient and the
/// key is retried with backoff.
#[async_trait]
pub trait Reconciler: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Name used in logs
    fn name(&self) -> &'static str;

    async fn reconcile(&self, key: &ObjectKey) -> Result<Action, Self::Error>;
}
