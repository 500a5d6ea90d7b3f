//! MCP Store - Resource store contract and reference backend
//!
//! Durable state for Deployables, Manifests and Work lives behind the
//! [`ResourceStore`] traits. Every reconciliation reads the store fresh, and
//! all writes go through optimistic concurrency on `resource_version`.
//!
//! ## Finalizer-gated deletion
//!
//! Deleting a record that still carries finalizers only sets its soft-delete
//! flag. The store removes the record once an update leaves it with no
//! finalizers.
//!
//! ## In-Memory vs Persistent
//!
//! [`InMemoryStore`] is suitable for development and testing. Persistent
//! backends implement the same traits.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod memory;
pub mod mutate;
pub mod traits;

// Re-exports
pub use error::{StoreError, StoreResult};
pub use memory::{FailurePlan, InMemoryStore, StoreOp};
pub use mutate::{create_or_patch, create_or_update, OperationResult, DEFAULT_CONFLICT_RETRIES};
pub use traits::{RecordStore, ResourceStore, WatchSource};
