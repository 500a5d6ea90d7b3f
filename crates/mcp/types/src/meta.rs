//! Record metadata shared by every stored kind
//!
//! Deletion is modelled explicitly: `deletion_requested_at` is the soft-delete
//! flag and `finalizers` is the set of cleanup owners that must release the
//! record before the store removes it.

use crate::constants::DEPLOYABLE_FINALIZER;
use crate::ids::ObjectKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// A cleanup owner that defers terminal removal of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Finalizer {
    /// Held by the dispatch controller until every derived Work is gone
    Dispatch,

    /// Held by some other component
    Other(String),
}

impl Finalizer {
    pub fn as_str(&self) -> &str {
        match self {
            Finalizer::Dispatch => DEPLOYABLE_FINALIZER,
            Finalizer::Other(name) => name,
        }
    }
}

impl From<String> for Finalizer {
    fn from(value: String) -> Self {
        if value == DEPLOYABLE_FINALIZER {
            Finalizer::Dispatch
        } else {
            Finalizer::Other(value)
        }
    }
}

impl From<Finalizer> for String {
    fn from(value: Finalizer) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Finalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle position of a record, derived from its metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Not marked for deletion
    Active,

    /// Deletion requested, waiting on `pending` finalizers
    Terminating { pending: usize },
}

/// Metadata carried by every record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub namespace: String,

    pub name: String,

    /// Assigned by the store on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uuid>,

    /// Bumped by the store on every write; zero means never persisted
    #[serde(default)]
    pub resource_version: u64,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub finalizers: BTreeSet<Finalizer>,

    /// Soft-delete flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_requested_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            uid: None,
            resource_version: 0,
            labels: BTreeMap::new(),
            finalizers: BTreeSet::new(),
            deletion_requested_at: None,
            created_at: None,
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.resource_version > 0
    }

    pub fn deletion_requested(&self) -> bool {
        self.deletion_requested_at.is_some()
    }

    pub fn has_finalizer(&self, finalizer: &Finalizer) -> bool {
        self.finalizers.contains(finalizer)
    }

    /// Returns true if the finalizer was not already present
    pub fn add_finalizer(&mut self, finalizer: Finalizer) -> bool {
        self.finalizers.insert(finalizer)
    }

    /// Returns true if the finalizer was present
    pub fn remove_finalizer(&mut self, finalizer: &Finalizer) -> bool {
        self.finalizers.remove(finalizer)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.deletion_requested() {
            Lifecycle::Terminating {
                pending: self.finalizers.len(),
            }
        } else {
            Lifecycle::Active
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalizer_round_trips_through_string() {
        let json = serde_json::to_string(&Finalizer::Dispatch).unwrap();
        assert_eq!(json, "\"deployable/apps.mcp.io\"");

        let other: Finalizer = serde_json::from_str("\"backup/example.io\"").unwrap();
        assert_eq!(other, Finalizer::Other("backup/example.io".into()));
    }

    #[test]
    fn test_lifecycle() {
        let mut meta = ObjectMeta::new("default", "web");
        assert_eq!(meta.lifecycle(), Lifecycle::Active);

        meta.add_finalizer(Finalizer::Dispatch);
        meta.deletion_requested_at = Some(Utc::now());
        assert_eq!(meta.lifecycle(), Lifecycle::Terminating { pending: 1 });
    }

    #[test]
    fn test_finalizer_add_remove_is_idempotent() {
        let mut meta = ObjectMeta::new("default", "web");
        assert!(meta.add_finalizer(Finalizer::Dispatch));
        assert!(!meta.add_finalizer(Finalizer::Dispatch));
        assert!(meta.remove_finalizer(&Finalizer::Dispatch));
        assert!(!meta.remove_finalizer(&Finalizer::Dispatch));
    }
}
