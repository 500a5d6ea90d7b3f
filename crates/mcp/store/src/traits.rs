//! Store trait definitions

use crate::error::StoreResult;
use async_trait::async_trait;
use mcp_types::{Deployable, Manifest, ObjectKey, Record, RecordKind, WatchEvent, Work};
use tokio::sync::broadcast;

/// Versioned storage for one record kind
///
/// `update` is optimistic: the record's `resource_version` must match the
/// stored one, otherwise the write fails with `StoreError::Conflict` and the
/// caller has to re-read before trying again.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Get a record by key
    async fn get(&self, key: &ObjectKey) -> StoreResult<Option<R>>;

    /// List all records of this kind
    async fn list(&self) -> StoreResult<Vec<R>>;

    /// Create a record, failing if the key is taken
    async fn create(&self, record: R) -> StoreResult<R>;

    /// Replace a record at the version it was read
    async fn update(&self, record: R) -> StoreResult<R>;

    /// Request deletion; deferred while finalizers remain
    async fn delete(&self, key: &ObjectKey) -> StoreResult<()>;
}

/// Change notifications for every stored kind
pub trait WatchSource: Send + Sync {
    /// Subscribe to changes made after this call
    fn watch(&self) -> broadcast::Receiver<WatchEvent>;

    /// Kinds this backend can store
    fn registered_kinds(&self) -> Vec<RecordKind>;
}

/// Combined store trait
pub trait ResourceStore:
    RecordStore<Deployable> + RecordStore<Manifest> + RecordStore<Work> + WatchSource
{
}

impl<T> ResourceStore for T where
    T: RecordStore<Deployable> + RecordStore<Manifest> + RecordStore<Work> + WatchSource + ?Sized
{
}
