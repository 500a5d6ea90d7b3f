//! Configuration for mcp-daemon

use mcp_controller::{BackoffConfig, ControllerConfig};
use mcp_types::constants::SYSTEM_NAMESPACE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Store backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Scheduler loop
    #[serde(default = "LoopConfig::scheduler")]
    pub scheduler: LoopConfig,

    /// Dispatch (ManifestWork) loop
    #[serde(default = "LoopConfig::dispatch")]
    pub dispatch: LoopConfig,

    /// Leader election
    #[serde(default)]
    pub leader_election: LeaderElectionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Refuse to start unless the store serves every record kind
    #[serde(default = "default_true")]
    pub enable_kind_check: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            scheduler: LoopConfig::scheduler(),
            dispatch: LoopConfig::dispatch(),
            leader_election: LeaderElectionConfig::default(),
            logging: LoggingConfig::default(),
            enable_kind_check: true,
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-process store; state is lost on exit and not shared between processes
    #[default]
    Memory,
}

/// Settings of one reconciliation loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Keys reconciled concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Full resync interval in seconds
    #[serde(default = "default_resync_interval")]
    pub resync_interval_secs: u64,

    /// Deadline for one reconciliation pass in seconds
    #[serde(default = "default_reconcile_timeout")]
    pub reconcile_timeout_secs: u64,

    /// Retry backoff
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl LoopConfig {
    pub fn scheduler() -> Self {
        Self {
            workers: 1,
            resync_interval_secs: default_resync_interval(),
            reconcile_timeout_secs: default_reconcile_timeout(),
            backoff: BackoffConfig::default(),
        }
    }

    pub fn dispatch() -> Self {
        Self {
            workers: 10,
            ..Self::scheduler()
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            workers: self.workers.max(1),
            resync_interval: Duration::from_secs(self.resync_interval_secs.max(1)),
            reconcile_timeout: Duration::from_secs(self.reconcile_timeout_secs.max(1)),
            backoff: self.backoff.clone(),
        }
    }
}

/// Leader election configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderElectionConfig {
    /// Run controllers only while holding the lease
    #[serde(default = "default_true")]
    pub leader_elect: bool,

    /// Namespace of the lock leases
    #[serde(default = "default_lock_namespace")]
    pub namespace: String,

    #[serde(default = "default_scheduler_lock")]
    pub scheduler_lock: String,

    #[serde(default = "default_controller_manager_lock")]
    pub controller_manager_lock: String,

    /// Lease lifetime in milliseconds
    #[serde(default = "default_lease_duration")]
    pub lease_duration_ms: u64,

    /// Renewal interval in milliseconds
    #[serde(default = "default_renew_interval")]
    pub renew_interval_ms: u64,

    /// Standby polling interval in milliseconds
    #[serde(default = "default_retry_period")]
    pub retry_period_ms: u64,
}

impl Default for LeaderElectionConfig {
    fn default() -> Self {
        Self {
            leader_elect: true,
            namespace: default_lock_namespace(),
            scheduler_lock: default_scheduler_lock(),
            controller_manager_lock: default_controller_manager_lock(),
            lease_duration_ms: default_lease_duration(),
            renew_interval_ms: default_renew_interval(),
            retry_period_ms: default_retry_period(),
        }
    }
}

impl LeaderElectionConfig {
    pub fn lease_duration(&self) -> Duration {
        Duration::from_millis(self.lease_duration_ms)
    }

    pub fn renew_interval(&self) -> Duration {
        Duration::from_millis(self.renew_interval_ms.max(1))
    }

    pub fn retry_period(&self) -> Duration {
        Duration::from_millis(self.retry_period_ms.max(1))
    }

    /// Fully qualified lock name, `namespace/name`
    pub fn lock(&self, name: &str) -> String {
        format!("{}/{}", self.namespace, name)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directives
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_workers() -> usize {
    1
}

fn default_resync_interval() -> u64 {
    300
}

fn default_reconcile_timeout() -> u64 {
    30
}

fn default_lock_namespace() -> String {
    SYSTEM_NAMESPACE.to_string()
}

fn default_scheduler_lock() -> String {
    "scheduler.mcp.io".to_string()
}

fn default_controller_manager_lock() -> String {
    "controller-manager.mcp.io".to_string()
}

fn default_lease_duration() -> u64 {
    15_000
}

fn default_renew_interval() -> u64 {
    5_000
}

fn default_retry_period() -> u64 {
    2_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then `MCP_` variables
    ///
    /// Nested keys use a double underscore, e.g. `MCP_DISPATCH__WORKERS=4`.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("MCP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
