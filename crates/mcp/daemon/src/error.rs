//! Error types for mcp-daemon

use mcp_controller::ControllerError;
use mcp_store::StoreError;
use mcp_types::RecordKind;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The store does not serve every record kind
    #[error("Record kinds not installed: {}", format_kinds(.0))]
    KindsMissing(Vec<RecordKind>),

    /// Seed file could not be loaded or applied
    #[error("Seed error: {0}")]
    Seed(String),

    /// Controller runtime error
    #[error("Controller error: {0}")]
    Controller(#[from] ControllerError),

    /// Background task failure
    #[error("Task error: {0}")]
    Task(String),

    /// Logging setup error
    #[error("Logging error: {0}")]
    Logging(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_kinds(kinds: &[RecordKind]) -> String {
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<config::ConfigError> for DaemonError {
    fn from(err: config::ConfigError) -> Self {
        DaemonError::Config(err.to_string())
    }
}

/// Result type for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
