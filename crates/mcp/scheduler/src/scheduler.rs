//! Scheduler reconciler

use crate::error::Result;
use crate::placement::decide;
use crate::SchedulerError;
use async_trait::async_trait;
use mcp_controller::{Action, Reconciler};
use mcp_store::{create_or_patch, OperationResult, RecordStore, ResourceStore};
use mcp_types::{Deployable, ObjectKey};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a scheduling pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// The Deployable no longer exists
    NotFound,

    /// Deletion was requested; cleanup belongs to the dispatch controller
    Terminating,

    AlreadyDecided,

    /// The placement was written
    Scheduled { clusters: usize },

    /// Another writer decided the placement first
    LostRace,
}

pub struct Scheduler {
    store: Arc<dyn ResourceStore>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Decide the placement of one Deployable, once
    pub async fn reconcile_key(&self, key: &ObjectKey) -> Result<ScheduleOutcome> {
        debug!(key = %key, "Reconcile for scheduler");

        let Some(deployable) = RecordStore::<Deployable>::get(&*self.store, key).await? else {
            return Ok(ScheduleOutcome::NotFound);
        };

        if deployable.metadata.deletion_requested() {
            debug!(key = %key, "Deployable is being deleted, skip");
            return Ok(ScheduleOutcome::Terminating);
        }

        if deployable.status.placement_decided {
            debug!(key = %key, "Deployable is scheduled, skip");
            return Ok(ScheduleOutcome::AlreadyDecided);
        }

        self.schedule_one(deployable).await
    }

    /// Write `placementDecided`, `applied` and the decisions, touching nothing else
    async fn schedule_one(&self, deployable: Deployable) -> Result<ScheduleOutcome> {
        let key = deployable.metadata.key();
        let mut clusters = 0;
        let mut skipped = None;

        let result = create_or_patch(&*self.store, deployable, |current: &mut Deployable| {
            // The record may have moved on since it was read
            skipped = if current.metadata.deletion_requested() {
                Some(ScheduleOutcome::Terminating)
            } else if current.status.placement_decided {
                Some(ScheduleOutcome::LostRace)
            } else {
                None
            };
            if skipped.is_some() {
                return;
            }
            let decisions = decide(&current.spec);
            clusters = decisions.len();
            current.status.placement_decided = true;
            current.status.applied = false;
            current.status.placement_decisions = decisions;
        })
        .await
        .map_err(|e| {
            warn!(key = %key, error = %e, "Unable to patch Deployable placement");
            SchedulerError::from(e)
        })?;

        match result {
            OperationResult::Unchanged => {
                let outcome = skipped.unwrap_or(ScheduleOutcome::LostRace);
                debug!(key = %key, outcome = ?outcome, "Placement left to another writer");
                Ok(outcome)
            }
            OperationResult::Created | OperationResult::Updated => {
                info!(key = %key, clusters, "Placement decided");
                Ok(ScheduleOutcome::Scheduled { clusters })
            }
        }
    }
}

#[async_trait]
impl Reconciler for Scheduler {
    type Error = SchedulerError;

    fn name(&self) -> &'static str {
        "scheduler"
    }

    async fn reconcile(&self, key: &ObjectKey) -> Result<Action> {
        self.reconcile_key(key).await.map(|_| Action::Done)
    }
}
