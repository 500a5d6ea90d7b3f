//! MCP Daemon library
//!
//! Bootstrap pieces shared by the `mcpd` binary and its tests:
//! - Layered configuration
//! - Logging setup
//! - Record kind check and seed loading
//! - Leader-gated controller manager

pub mod config;
pub mod error;
pub mod kinds;
pub mod logging;
pub mod manager;
pub mod seed;

pub use config::DaemonConfig;
pub use error::{DaemonError, DaemonResult};
pub use manager::{Component, Manager};
pub use seed::SeedFile;
