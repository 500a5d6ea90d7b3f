//! MCP Controller - Level-triggered reconciliation runtime
//!
//! Controllers re-derive desired state from the current record every time a
//! key is processed, so delivery order and duplicate notifications do not
//! matter. This crate provides the plumbing shared by the scheduler and the
//! dispatch controller:
//!
//! - **Reconciler**: idempotent handler keyed by record identity
//! - **WorkQueue**: de-duplicating queue that never hands one key to two workers
//! - **Backoff**: per-key exponential retry delays
//! - **Controller**: bounded worker pool fed by watch events and periodic resync
//! - **LeaderElector**: lease-based election so only one instance reconciles

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod backoff;
pub mod config;
pub mod controller;
pub mod error;
pub mod leader;
pub mod queue;
pub mod reconciler;

// Re-exports
pub use backoff::Backoff;
pub use config::{BackoffConfig, ControllerConfig};
pub use controller::{Controller, KeyMapper};
pub use error::{ControllerError, Result};
pub use leader::{InMemoryLeaderElector, LeaderElector, LeadershipResult, RenewalResult};
pub use queue::WorkQueue;
pub use reconciler::{Action, Reconciler};
