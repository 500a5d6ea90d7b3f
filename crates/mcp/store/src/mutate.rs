//! Optimistic read-modify-write helpers
//!
//! Both helpers read the current record, apply a scoped mutation to that
//! fresh copy and write it back only if something changed. A write that
//! loses a version race is retried against a re-read record, up to
//! [`DEFAULT_CONFLICT_RETRIES`] attempts; after that the conflict is
//! surfaced so the caller can requeue.

use crate::error::{StoreError, StoreResult};
use crate::traits::RecordStore;
use mcp_types::Record;
use tracing::debug;

/// Attempts made before a version conflict is surfaced
pub const DEFAULT_CONFLICT_RETRIES: usize = 5;

/// What a create-or-update call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CreatePolicy {
    /// Create whenever the record is absent
    Always,
    /// Create only records that were never persisted
    UnlessPersisted,
}

/// Create `record` (mutated) if absent, otherwise mutate and update the stored one
///
/// Used for records whose payload is fully owned by the caller: the mutation
/// typically overwrites the whole payload.
pub async fn create_or_update<R, S, F>(
    store: &S,
    record: R,
    mutate: F,
) -> StoreResult<OperationResult>
where
    R: Record,
    S: RecordStore<R> + ?Sized,
    F: FnMut(&mut R) + Send,
{
    read_modify_write(store, record, mutate, CreatePolicy::Always).await
}

/// Merge the fields the caller owns into the stored record
///
/// Fields the mutation does not touch keep whatever value concurrent writers
/// left in the store. A record that was persisted before and has since
/// disappeared is not recreated; that surfaces as `StoreError::NotFound`.
pub async fn create_or_patch<R, S, F>(
    store: &S,
    record: R,
    mutate: F,
) -> StoreResult<OperationResult>
where
    R: Record,
    S: RecordStore<R> + ?Sized,
    F: FnMut(&mut R) + Send,
{
    read_modify_write(store, record, mutate, CreatePolicy::UnlessPersisted).await
}

async fn read_modify_write<R, S, F>(
    store: &S,
    record: R,
    mut mutate: F,
    policy: CreatePolicy,
) -> StoreResult<OperationResult>
where
    R: Record,
    S: RecordStore<R> + ?Sized,
    F: FnMut(&mut R) + Send,
{
    let key = record.key();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let outcome = match store.get(&key).await? {
            None => {
                if policy == CreatePolicy::UnlessPersisted && record.metadata().is_persisted() {
                    return Err(StoreError::NotFound { kind: R::KIND, key });
                }
                let mut fresh = record.clone();
                mutate(&mut fresh);
                store.create(fresh).await.map(|_| OperationResult::Created)
            }
            Some(current) => {
                let mut next = current.clone();
                mutate(&mut next);
                if next == current {
                    return Ok(OperationResult::Unchanged);
                }
                store.update(next).await.map(|_| OperationResult::Updated)
            }
        };

        match outcome {
            Ok(result) => return Ok(result),
            Err(err) if is_lost_race(&err) && attempt < DEFAULT_CONFLICT_RETRIES => {
                debug!(
                    kind = R::KIND.as_str(),
                    key = %key,
                    attempt,
                    error = %err,
                    "Write lost a race, retrying against a fresh read"
                );
            }
            Err(err) => return Err(err),
        }
    }
}

fn is_lost_race(err: &StoreError) -> bool {
    matches!(
        err,
        StoreError::Conflict { .. } | StoreError::AlreadyExists { .. }
    )
}
