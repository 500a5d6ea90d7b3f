//! Dispatch controller

use crate::error::{DispatchError, Result};
use crate::phase::DispatchPhase;
use async_trait::async_trait;
use mcp_controller::{Action, Reconciler};
use mcp_store::{create_or_patch, create_or_update, OperationResult, RecordStore, ResourceStore};
use mcp_types::{Deployable, Finalizer, Manifest, ObjectKey, Work};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct DispatchController {
    store: Arc<dyn ResourceStore>,
}

impl DispatchController {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Drive one Deployable one step through its dispatch state machine
    ///
    /// Returns the phase the Deployable was found in, `None` when it no longer
    /// exists. Finalizer and `applied` changes are persisted in one status
    /// write after the main step, even when that step failed.
    pub async fn reconcile_key(&self, key: &ObjectKey) -> Result<Option<DispatchPhase>> {
        let Some(observed) = RecordStore::<Deployable>::get(&*self.store, key).await? else {
            return Ok(None);
        };

        let phase = DispatchPhase::of(&observed);
        debug!(key = %key, phase = %phase, "Reconcile for Deployable");

        let mut desired = observed.clone();
        let main = match phase {
            DispatchPhase::PendingFinalizer => {
                desired.metadata.add_finalizer(Finalizer::Dispatch);
                Ok(())
            }
            DispatchPhase::Deleting => self.reconcile_delete(&mut desired).await,
            DispatchPhase::ApplyPending => self.reconcile_apply(&mut desired).await,
            DispatchPhase::Released | DispatchPhase::Unscheduled | DispatchPhase::Applied => Ok(()),
        };

        let bookkeeping = self.persist_status(&observed, &desired).await;

        match DispatchError::aggregate(main.err().into_iter().chain(bookkeeping.err())) {
            Some(e) => Err(e),
            None => Ok(Some(phase)),
        }
    }

    /// Write every Work for the decided placement, then mark the Deployable applied
    async fn reconcile_apply(&self, deployable: &mut Deployable) -> Result<()> {
        let key = deployable.metadata.key();

        // Resolve everything first so a missing Manifest leaves no Work behind
        let mut works = Vec::with_capacity(deployable.status.placement_decisions.len());
        for decision in &deployable.status.placement_decisions {
            let mut manifests = Vec::with_capacity(decision.resources.len());
            for resource in &decision.resources {
                let manifest_key = resource.manifest_object_key();
                let manifest = RecordStore::<Manifest>::get(&*self.store, &manifest_key)
                    .await?
                    .ok_or_else(|| DispatchError::ManifestNotFound {
                        key: manifest_key.clone(),
                        resource: resource.clone(),
                    })?;
                manifests.push(manifest.template);
            }
            works.push(Work::for_deployable(&decision.cluster, deployable).with_manifests(manifests));
        }

        for work in works {
            let work_key = work.metadata.key();
            let desired_labels = work.metadata.labels.clone();
            let desired_spec = work.spec.clone();

            let result = create_or_update(&*self.store, work, |current: &mut Work| {
                current.spec = desired_spec.clone();
                current.metadata.labels.extend(desired_labels.clone());
            })
            .await
            .map_err(|source| {
                warn!(key = %work_key, error = %source, "Unable to create or update Work");
                DispatchError::WorkWrite {
                    key: work_key.clone(),
                    source,
                }
            })?;

            match result {
                OperationResult::Created => debug!(key = %work_key, "Work created"),
                OperationResult::Updated => debug!(key = %work_key, "Work updated"),
                OperationResult::Unchanged => {}
            }
        }

        info!(
            key = %key,
            clusters = deployable.status.placement_decisions.len(),
            "Deployable applied"
        );
        deployable.status.applied = true;
        Ok(())
    }

    /// Remove every Work of the Deployable, then release our finalizer
    async fn reconcile_delete(&self, deployable: &mut Deployable) -> Result<()> {
        let key = deployable.metadata.key();

        if deployable.status.placement_decided {
            for decision in &deployable.status.placement_decisions {
                let work_key = Work::key_for(&decision.cluster, deployable);
                match RecordStore::<Work>::delete(&*self.store, &work_key).await {
                    Ok(()) => debug!(key = %work_key, "Work deleted"),
                    Err(e) if e.is_not_found() => {}
                    Err(source) => {
                        return Err(DispatchError::WorkDelete {
                            key: work_key,
                            source,
                        })
                    }
                }
            }
        }

        info!(key = %key, "Work removed, releasing Deployable");
        deployable.status.applied = false;
        deployable.metadata.remove_finalizer(&Finalizer::Dispatch);
        Ok(())
    }

    /// Merge our marker and `applied` changes into the stored Deployable
    async fn persist_status(&self, observed: &Deployable, desired: &Deployable) -> Result<()> {
        let marker = match (
            observed.metadata.has_finalizer(&Finalizer::Dispatch),
            desired.metadata.has_finalizer(&Finalizer::Dispatch),
        ) {
            (false, true) => Some(true),
            (true, false) => Some(false),
            _ => None,
        };
        let applied = (observed.status.applied != desired.status.applied)
            .then_some(desired.status.applied);

        if marker.is_none() && applied.is_none() {
            return Ok(());
        }

        let key = observed.metadata.key();
        let result = create_or_patch(&*self.store, observed.clone(), |current: &mut Deployable| {
            match marker {
                Some(true) if !current.metadata.deletion_requested() => {
                    current.metadata.add_finalizer(Finalizer::Dispatch);
                }
                Some(false) => {
                    current.metadata.remove_finalizer(&Finalizer::Dispatch);
                }
                _ => {}
            }
            if let Some(applied) = applied {
                current.status.applied = applied;
            }
        })
        .await;

        match result {
            Ok(_) => Ok(()),
            // Releasing the last marker lets the store remove the record
            Err(e) if e.is_not_found() => Ok(()),
            Err(source) => {
                warn!(key = %key, error = %source, "Unable to create or patch Deployable");
                Err(DispatchError::Bookkeeping { key, source })
            }
        }
    }
}

#[async_trait]
impl Reconciler for DispatchController {
    type Error = DispatchError;

    fn name(&self) -> &'static str {
        "manifestwork"
    }

    async fn reconcile(&self, key: &ObjectKey) -> Result<Action> {
        self.reconcile_key(key).await.map(|_| Action::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_store::{FailurePlan, InMemoryStore, StoreError, StoreOp};
    use mcp_types::{PlacementDecision, RecordKind, ResourceRef};
    use serde_json::json;

    fn nginx() -> ResourceRef {
        ResourceRef::new("apps/v1", "Deployment", "default", "my-nginx")
    }

    fn nginx_manifest() -> Manifest {
        Manifest::for_resource(
            &nginx(),
            json!({"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "my-nginx"}}),
        )
    }

    /// Deployable already holding our marker with a decided placement
    fn scheduled(clusters: &[&str]) -> Deployable {
        let mut deployable = Deployable::new("default", "web")
            .with_clusters(clusters.iter().copied())
            .with_resources([nginx()]);
        deployable.metadata.add_finalizer(Finalizer::Dispatch);
        deployable.status.placement_decided = true;
        deployable.status.placement_decisions = clusters
            .iter()
            .map(|c| PlacementDecision {
                cluster: c.to_string(),
                resources: vec![nginx()],
            })
            .collect();
        deployable
    }

    async fn setup(deployable: Deployable) -> (Arc<InMemoryStore>, DispatchController, ObjectKey) {
        let store = Arc::new(InMemoryStore::new());
        RecordStore::<Manifest>::create(&*store, nginx_manifest())
            .await
            .unwrap();
        let key = deployable.metadata.key();
        RecordStore::<Deployable>::create(&*store, deployable)
            .await
            .unwrap();
        let controller = DispatchController::new(store.clone());
        (store, controller, key)
    }

    async fn fetch(store: &InMemoryStore, key: &ObjectKey) -> Option<Deployable> {
        RecordStore::<Deployable>::get(store, key).await.unwrap()
    }

    #[tokio::test]
    async fn test_finalizer_added_first() {
        let (store, controller, key) = setup(Deployable::new("default", "web")).await;

        let phase = controller.reconcile_key(&key).await.unwrap();
        assert_eq!(phase, Some(DispatchPhase::PendingFinalizer));

        let stored = fetch(&store, &key).await.unwrap();
        assert!(stored.metadata.has_finalizer(&Finalizer::Dispatch));
        assert!(RecordStore::<Work>::list(&*store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unscheduled_is_noop() {
        let mut deployable = Deployable::new("default", "web");
        deployable.metadata.add_finalizer(Finalizer::Dispatch);
        let (store, controller, key) = setup(deployable).await;
        let writes = store.write_count();

        let phase = controller.reconcile_key(&key).await.unwrap();
        assert_eq!(phase, Some(DispatchPhase::Unscheduled));
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_apply_writes_work_per_cluster() {
        let (store, controller, key) = setup(scheduled(&["east", "west"])).await;

        let phase = controller.reconcile_key(&key).await.unwrap();
        assert_eq!(phase, Some(DispatchPhase::ApplyPending));

        let works = RecordStore::<Work>::list(&*store).await.unwrap();
        assert_eq!(works.len(), 2);
        for work in &works {
            assert_eq!(work.metadata.name, "default-web");
            assert_eq!(work.owner(), Some(key.clone()));
            assert_eq!(work.spec.workload.manifests, vec![nginx_manifest().template]);
        }
        assert!(fetch(&store, &key).await.unwrap().status.applied);
    }

    #[tokio::test]
    async fn test_applied_is_idempotent() {
        let (store, controller, key) = setup(scheduled(&["east"])).await;
        controller.reconcile_key(&key).await.unwrap();
        let writes = store.write_count();

        for _ in 0..3 {
            let phase = controller.reconcile_key(&key).await.unwrap();
            assert_eq!(phase, Some(DispatchPhase::Applied));
        }
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_apply_overwrites_edited_work() {
        let (store, controller, key) = setup(scheduled(&["east"])).await;

        // Stale Work left behind with a hand-edited payload
        let deployable = fetch(&store, &key).await.unwrap();
        let stale = Work::for_deployable("east", &deployable).with_manifests(vec![json!({"stale": true})]);
        RecordStore::<Work>::create(&*store, stale).await.unwrap();

        controller.reconcile_key(&key).await.unwrap();

        let work = RecordStore::<Work>::get(&*store, &Work::key_for("east", &deployable))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(work.spec.workload.manifests, vec![nginx_manifest().template]);
    }

    #[tokio::test]
    async fn test_missing_manifest_writes_nothing() {
        let mut deployable = scheduled(&["east", "west"]);
        let missing = ResourceRef::new("v1", "Service", "default", "my-nginx");
        for decision in &mut deployable.status.placement_decisions {
            decision.resources.push(missing.clone());
        }
        let (store, controller, key) = setup(deployable).await;

        let err = controller.reconcile_key(&key).await.unwrap_err();
        assert!(err.is_referential());
        assert!(RecordStore::<Work>::list(&*store).await.unwrap().is_empty());
        assert!(!fetch(&store, &key).await.unwrap().status.applied);

        RecordStore::<Manifest>::create(
            &*store,
            Manifest::for_resource(&missing, json!({"kind": "Service"})),
        )
        .await
        .unwrap();

        controller.reconcile_key(&key).await.unwrap();
        let works = RecordStore::<Work>::list(&*store).await.unwrap();
        assert_eq!(works.len(), 2);
        assert!(works.iter().all(|w| w.spec.workload.manifests.len() == 2));
    }

    #[tokio::test]
    async fn test_delete_removes_work_then_record() {
        let (store, controller, key) = setup(scheduled(&["east", "west"])).await;
        controller.reconcile_key(&key).await.unwrap();

        RecordStore::<Deployable>::delete(&*store, &key).await.unwrap();
        assert!(fetch(&store, &key).await.is_some(), "marker must hold the record");

        let phase = controller.reconcile_key(&key).await.unwrap();
        assert_eq!(phase, Some(DispatchPhase::Deleting));
        assert!(RecordStore::<Work>::list(&*store).await.unwrap().is_empty());
        assert!(fetch(&store, &key).await.is_none());

        assert_eq!(controller.reconcile_key(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_marker() {
        let (store, controller, key) = setup(scheduled(&["east"])).await;
        controller.reconcile_key(&key).await.unwrap();
        RecordStore::<Deployable>::delete(&*store, &key).await.unwrap();

        let deployable = fetch(&store, &key).await.unwrap();
        store.inject_failure(
            FailurePlan::new(
                RecordKind::Work,
                StoreOp::Delete,
                StoreError::Timeout("delete east/default-web".into()),
            )
            .for_key(Work::key_for("east", &deployable)),
        );

        let err = controller.reconcile_key(&key).await.unwrap_err();
        assert!(matches!(err, DispatchError::WorkDelete { .. }));

        let still_there = fetch(&store, &key).await.unwrap();
        assert!(still_there.metadata.has_finalizer(&Finalizer::Dispatch));
        assert!(still_there.status.applied);
    }

    #[tokio::test]
    async fn test_status_write_failure_surfaces() {
        let (store, controller, key) = setup(scheduled(&["east"])).await;
        store.inject_failure(
            FailurePlan::new(
                RecordKind::Deployable,
                StoreOp::Update,
                StoreError::Unavailable("status write".into()),
            )
            .for_key(key.clone()),
        );

        let err = controller.reconcile_key(&key).await.unwrap_err();
        assert!(matches!(err, DispatchError::Bookkeeping { .. }));
        assert!(!fetch(&store, &key).await.unwrap().status.applied);

        // Work already written is simply confirmed on the next pass
        controller.reconcile_key(&key).await.unwrap();
        assert!(fetch(&store, &key).await.unwrap().status.applied);
    }

    #[tokio::test]
    async fn test_failed_marker_write_is_retried() {
        let (store, controller, key) = setup(Deployable::new("default", "web")).await;
        store.inject_failure(
            FailurePlan::new(
                RecordKind::Deployable,
                StoreOp::Update,
                StoreError::Unavailable("status write".into()),
            )
            .for_key(key.clone()),
        );
        controller.reconcile_key(&key).await.unwrap_err();

        // Marker is added on the retry
        controller.reconcile_key(&key).await.unwrap();
        assert!(fetch(&store, &key)
            .await
            .unwrap()
            .metadata
            .has_finalizer(&Finalizer::Dispatch));
    }

    #[tokio::test]
    async fn test_patch_keeps_foreign_finalizers() {
        let mut deployable = scheduled(&["east"]);
        deployable
            .metadata
            .add_finalizer(Finalizer::Other("backup.example.io".into()));
        let (store, controller, key) = setup(deployable).await;
        controller.reconcile_key(&key).await.unwrap();

        RecordStore::<Deployable>::delete(&*store, &key).await.unwrap();
        controller.reconcile_key(&key).await.unwrap();

        let held = fetch(&store, &key).await.unwrap();
        assert!(!held.metadata.has_finalizer(&Finalizer::Dispatch));
        assert!(held
            .metadata
            .has_finalizer(&Finalizer::Other("backup.example.io".into())));
        assert_eq!(DispatchPhase::of(&held), DispatchPhase::Released);
    }
}
