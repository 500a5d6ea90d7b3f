//! MCP Dispatch - Work materialization for scheduled Deployables
//!
//! For every Deployable with a decided but unapplied placement, the dispatch
//! controller resolves each referenced Manifest and writes one Work per
//! target cluster. It holds a finalizer on every Deployable so that deleting
//! one first removes all of its Work records.
//!
//! ## State machine
//!
//! | Phase | Condition | Action |
//! |---|---|---|
//! | `PendingFinalizer` | marker absent | add marker |
//! | `Deleting` | deletion requested, marker present | delete Work, release marker |
//! | `Unscheduled` | placement not decided | none |
//! | `Applied` | decided and applied | none |
//! | `ApplyPending` | decided, not applied | write Work, set `applied` |

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod controller;
pub mod error;
pub mod phase;

pub use controller::DispatchController;
pub use error::{DispatchError, Result};
pub use phase::DispatchPhase;
