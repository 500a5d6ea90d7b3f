//! In-memory store implementation
//!
//! Suitable for development and testing. Every successful write bumps a
//! store-wide version counter and is published on the watch channel.

use crate::error::{StoreError, StoreResult};
use crate::traits::{RecordStore, WatchSource};
use async_trait::async_trait;
use mcp_types::{
    Deployable, Manifest, ObjectKey, Record, RecordKind, WatchEvent, WatchEventType, Work,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

const WATCH_CHANNEL_CAPACITY: usize = 1024;

/// Store operation, used to target injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Get,
    List,
    Create,
    Update,
    Delete,
}

/// Makes matching operations fail with a chosen error
///
/// Intended for tests that simulate crashes and transient outages.
#[derive(Debug, Clone)]
pub struct FailurePlan {
    pub kind: RecordKind,
    pub op: StoreOp,
    /// Restrict to one key; any key when unset
    pub key: Option<ObjectKey>,
    pub error: StoreError,
    /// How many matching operations fail before the plan is spent
    pub remaining: usize,
}

impl FailurePlan {
    pub fn new(kind: RecordKind, op: StoreOp, error: StoreError) -> Self {
        Self {
            kind,
            op,
            key: None,
            error,
            remaining: 1,
        }
    }

    pub fn for_key(mut self, key: ObjectKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn times(mut self, count: usize) -> Self {
        self.remaining = count;
        self
    }

    fn matches(&self, kind: RecordKind, op: StoreOp, key: Option<&ObjectKey>) -> bool {
        self.remaining > 0
            && self.kind == kind
            && self.op == op
            && match (&self.key, key) {
                (None, _) => true,
                (Some(expected), Some(actual)) => expected == actual,
                (Some(_), None) => false,
            }
    }
}

/// In-memory store for development and testing
#[derive(Debug)]
pub struct InMemoryStore {
    deployables: RwLock<HashMap<ObjectKey, Deployable>>,
    manifests: RwLock<HashMap<ObjectKey, Manifest>>,
    works: RwLock<HashMap<ObjectKey, Work>>,
    version: AtomicU64,
    writes: AtomicU64,
    events: broadcast::Sender<WatchEvent>,
    failures: Mutex<Vec<FailurePlan>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(WATCH_CHANNEL_CAPACITY);
        Self {
            deployables: RwLock::new(HashMap::new()),
            manifests: RwLock::new(HashMap::new()),
            works: RwLock::new(HashMap::new()),
            version: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            events,
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Number of successful mutations since creation
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Queue a failure for the next matching operation(s)
    pub fn inject_failure(&self, plan: FailurePlan) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(plan);
    }

    fn take_failure(
        &self,
        kind: RecordKind,
        op: StoreOp,
        key: Option<&ObjectKey>,
    ) -> StoreResult<()> {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(plan) = failures.iter_mut().find(|p| p.matches(kind, op, key)) else {
            return Ok(());
        };
        plan.remaining -= 1;
        let error = plan.error.clone();
        failures.retain(|p| p.remaining > 0);
        Err(error)
    }

    fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn publish<R: Record>(&self, event_type: WatchEventType, record: &R) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let event = WatchEvent::new(
            R::KIND,
            event_type,
            record.key(),
            record.metadata().labels.clone(),
        );
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    async fn get_in<R: Record>(
        &self,
        table: &RwLock<HashMap<ObjectKey, R>>,
        key: &ObjectKey,
    ) -> StoreResult<Option<R>> {
        self.take_failure(R::KIND, StoreOp::Get, Some(key))?;
        let records = table.read().await;
        Ok(records.get(key).cloned())
    }

    async fn list_in<R: Record>(&self, table: &RwLock<HashMap<ObjectKey, R>>) -> StoreResult<Vec<R>> {
        self.take_failure(R::KIND, StoreOp::List, None)?;
        let records = table.read().await;
        let mut listed: Vec<R> = records.values().cloned().collect();
        listed.sort_by_key(|r| r.key());
        Ok(listed)
    }

    async fn create_in<R: Record>(
        &self,
        table: &RwLock<HashMap<ObjectKey, R>>,
        mut record: R,
    ) -> StoreResult<R> {
        let key = record.key();
        self.take_failure(R::KIND, StoreOp::Create, Some(&key))?;

        let mut records = table.write().await;
        if records.contains_key(&key) {
            return Err(StoreError::AlreadyExists { kind: R::KIND, key });
        }

        let meta = record.metadata_mut();
        meta.uid = Some(Uuid::new_v4());
        meta.created_at = Some(chrono::Utc::now());
        meta.deletion_requested_at = None;
        meta.resource_version = self.next_version();

        records.insert(key, record.clone());
        self.publish(WatchEventType::Added, &record);
        Ok(record)
    }

    async fn update_in<R: Record>(
        &self,
        table: &RwLock<HashMap<ObjectKey, R>>,
        mut record: R,
    ) -> StoreResult<R> {
        let key = record.key();
        self.take_failure(R::KIND, StoreOp::Update, Some(&key))?;

        let mut records = table.write().await;
        let Some(current) = records.get(&key) else {
            return Err(StoreError::NotFound { kind: R::KIND, key });
        };
        let current_meta = current.metadata();

        if record.metadata().resource_version != current_meta.resource_version {
            return Err(StoreError::Conflict {
                kind: R::KIND,
                key,
                expected: record.metadata().resource_version,
                actual: current_meta.resource_version,
            });
        }

        if current_meta.deletion_requested()
            && !record
                .metadata()
                .finalizers
                .is_subset(&current_meta.finalizers)
        {
            return Err(StoreError::Invalid {
                kind: R::KIND,
                key,
                reason: "finalizers cannot be added to a record being deleted".into(),
            });
        }

        let uid = current_meta.uid;
        let created_at = current_meta.created_at;
        let deletion_requested_at = current_meta.deletion_requested_at;

        let meta = record.metadata_mut();
        meta.uid = uid;
        meta.created_at = created_at;
        meta.deletion_requested_at = deletion_requested_at;
        meta.resource_version = self.next_version();

        if meta.deletion_requested() && meta.finalizers.is_empty() {
            records.remove(&key);
            tracing::debug!(
                kind = R::KIND.as_str(),
                key = %key,
                "Last finalizer released, record removed"
            );
            self.publish(WatchEventType::Deleted, &record);
        } else {
            records.insert(key, record.clone());
            self.publish(WatchEventType::Modified, &record);
        }

        Ok(record)
    }

    async fn delete_in<R: Record>(
        &self,
        table: &RwLock<HashMap<ObjectKey, R>>,
        key: &ObjectKey,
    ) -> StoreResult<()> {
        self.take_failure(R::KIND, StoreOp::Delete, Some(key))?;

        let mut records = table.write().await;
        let Some(current) = records.get_mut(key) else {
            return Err(StoreError::NotFound {
                kind: R::KIND,
                key: key.clone(),
            });
        };

        if current.metadata().finalizers.is_empty() {
            if let Some(removed) = records.remove(key) {
                self.publish(WatchEventType::Deleted, &removed);
            }
            return Ok(());
        }

        if current.metadata().deletion_requested() {
            return Ok(());
        }

        let version = self.next_version();
        let meta = current.metadata_mut();
        meta.deletion_requested_at = Some(chrono::Utc::now());
        meta.resource_version = version;
        let snapshot = current.clone();
        self.publish(WatchEventType::Modified, &snapshot);
        Ok(())
    }
}

macro_rules! record_store {
    ($record:ty, $table:ident) => {
        #[async_trait]
        impl RecordStore<$record> for InMemoryStore {
            async fn get(&self, key: &ObjectKey) -> StoreResult<Option<$record>> {
                self.get_in(&self.$table, key).await
            }

            async fn list(&self) -> StoreResult<Vec<$record>> {
                self.list_in(&self.$table).await
            }

            async fn create(&self, record: $record) -> StoreResult<$record> {
                self.create_in(&self.$table, record).await
            }

            async fn update(&self, record: $record) -> StoreResult<$record> {
                self.update_in(&self.$table, record).await
            }

            async fn delete(&self, key: &ObjectKey) -> StoreResult<()> {
                self.delete_in::<$record>(&self.$table, key).await
            }
        }
    };
}

record_store!(Deployable, deployables);
record_store!(Manifest, manifests);
record_store!(Work, works);

impl WatchSource for InMemoryStore {
    fn watch(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }

    fn registered_kinds(&self) -> Vec<RecordKind> {
        RecordKind::ALL.to_vec()
    }
}
