//! MCP Types - Record model for multi-cluster distribution
//!
//! A user declares a [`Deployable`] naming which target clusters receive which
//! resources. The scheduler decides a placement, and the dispatch controller
//! turns that placement into one [`Work`] per target cluster, built from the
//! stored [`Manifest`] templates.
//!
//! ## Key Concepts
//!
//! - **Deployable**: Declared intent, maps a resource list to target clusters
//! - **Manifest**: Stored raw template for one concrete resource
//! - **Work**: Per-(Deployable, cluster) set of resolved manifest bodies
//! - **Finalizer**: Marker that defers terminal removal until cleanup completes
//! - **RecordKind**: Static registry of the record kinds this system stores

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod constants;
pub mod deployable;
pub mod events;
pub mod ids;
pub mod manifest;
pub mod meta;
pub mod record;
pub mod resource;
pub mod work;

// Re-export main types
pub use deployable::{
    Deployable, DeployableSpec, DeployableStatus, Placement, PlacementDecision, ValidationError,
};
pub use events::{WatchEvent, WatchEventType};
pub use ids::ObjectKey;
pub use manifest::Manifest;
pub use meta::{Finalizer, Lifecycle, ObjectMeta};
pub use record::{Record, RecordKind};
pub use resource::ResourceRef;
pub use work::{Work, WorkSpec, Workload};
