//! MCP Scheduler - Placement decisions for Deployables
//!
//! The scheduler decides, exactly once per Deployable, which clusters
//! receive which resources. Every target cluster receives the full resource
//! list in declaration order. A decided placement is never revisited.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod placement;
pub mod scheduler;

pub use error::{Result, SchedulerError};
pub use placement::decide;
pub use scheduler::{ScheduleOutcome, Scheduler};
