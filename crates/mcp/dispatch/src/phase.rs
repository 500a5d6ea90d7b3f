//! Dispatch state of a Deployable

use mcp_types::{Deployable, Finalizer, Lifecycle};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    /// Our marker is not on the record yet
    PendingFinalizer,

    /// Deletion requested while we still hold the marker
    Deleting,

    /// Deletion requested and our marker is already gone
    Released,

    Unscheduled,

    Applied,

    ApplyPending,
}

impl DispatchPhase {
    pub fn of(deployable: &Deployable) -> Self {
        let meta = &deployable.metadata;
        let marked = meta.has_finalizer(&Finalizer::Dispatch);

        match (meta.lifecycle(), marked) {
            (Lifecycle::Terminating { .. }, true) => Self::Deleting,
            (Lifecycle::Terminating { .. }, false) => Self::Released,
            (Lifecycle::Active, false) => Self::PendingFinalizer,
            (Lifecycle::Active, true) => {
                match (deployable.status.placement_decided, deployable.status.applied) {
                    (false, _) => Self::Unscheduled,
                    (true, true) => Self::Applied,
                    (true, false) => Self::ApplyPending,
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingFinalizer => "pending-finalizer",
            Self::Deleting => "deleting",
            Self::Released => "released",
            Self::Unscheduled => "unscheduled",
            Self::Applied => "applied",
            Self::ApplyPending => "apply-pending",
        }
    }
}

impl fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
