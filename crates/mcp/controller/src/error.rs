//! Controller runtime errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Lease backend error: {0}")]
    Lease(String),

    #[error("Controller {0} stopped: watch stream closed")]
    WatchClosed(&'static str),
}

/// Result type for controller runtime operations
pub type Result<T> = std::result::Result<T, ControllerError>;
