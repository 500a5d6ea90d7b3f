//! Scheduler errors

use mcp_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SchedulerError {
    /// Transient failure that a requeue can fix
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retriable(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
