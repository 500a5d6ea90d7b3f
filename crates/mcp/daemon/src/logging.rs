//! Tracing subscriber setup

use crate::config::LoggingConfig;
use crate::error::{DaemonError, DaemonResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init(config: &LoggingConfig) -> DaemonResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| DaemonError::Logging(format!("invalid filter {:?}: {}", config.level, e)))?;

    let result = if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    result.map_err(|e| DaemonError::Logging(e.to_string()))
}
