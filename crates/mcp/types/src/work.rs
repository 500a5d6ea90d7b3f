//! Work - resolved manifests for one (Deployable, cluster) pair
//!
//! A Work lives in the namespace named after its target cluster and is
//! named `{deployableNamespace}-{deployableName}`. Its payload is fully
//! owned by the dispatch controller and replaced wholesale on each write.

use crate::constants::{DEPLOYABLE_LABEL_NAME, DEPLOYABLE_LABEL_NAMESPACE};
use crate::deployable::Deployable;
use crate::ids::ObjectKey;
use crate::meta::ObjectMeta;
use crate::record::{Record, RecordKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-cluster unit handed to a remote agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: WorkSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkSpec {
    #[serde(default)]
    pub workload: Workload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    /// Manifest bodies in placement order
    #[serde(default)]
    pub manifests: Vec<serde_json::Value>,
}

impl Work {
    /// Store key of the Work for a Deployable on one cluster
    pub fn key_for(cluster: &str, deployable: &Deployable) -> ObjectKey {
        ObjectKey::new(cluster, deployable.work_name())
    }

    /// Empty Work for a Deployable on one cluster, labelled with its owner
    pub fn for_deployable(cluster: &str, deployable: &Deployable) -> Self {
        let metadata = ObjectMeta::new(cluster, deployable.work_name())
            .with_label(DEPLOYABLE_LABEL_NAMESPACE, deployable.metadata.namespace.clone())
            .with_label(DEPLOYABLE_LABEL_NAME, deployable.metadata.name.clone());

        Self {
            metadata,
            spec: WorkSpec::default(),
        }
    }

    pub fn with_manifests(mut self, manifests: Vec<serde_json::Value>) -> Self {
        self.spec.workload.manifests = manifests;
        self
    }

    pub fn cluster(&self) -> &str {
        &self.metadata.namespace
    }

    /// Key of the Deployable that produced this Work, if labelled
    pub fn owner(&self) -> Option<ObjectKey> {
        owner_from_labels(&self.metadata.labels)
    }
}

/// Owning Deployable key recorded in a Work's labels
pub fn owner_from_labels(labels: &BTreeMap<String, String>) -> Option<ObjectKey> {
    match (
        labels.get(DEPLOYABLE_LABEL_NAMESPACE),
        labels.get(DEPLOYABLE_LABEL_NAME),
    ) {
        (Some(namespace), Some(name)) => Some(ObjectKey::new(namespace.clone(), name.clone())),
        _ => None,
    }
}

impl Record for Work {
    const KIND: RecordKind = RecordKind::Work;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_identity() {
        let deployable = Deployable::new("default", "web");
        let work = Work::for_deployable("east", &deployable);

        assert_eq!(work.key(), ObjectKey::new("east", "default-web"));
        assert_eq!(work.key(), Work::key_for("east", &deployable));
        assert_eq!(work.cluster(), "east");
        assert_eq!(work.owner(), Some(ObjectKey::new("default", "web")));
    }

    #[test]
    fn test_unlabelled_work_has_no_owner() {
        let work = Work {
            metadata: ObjectMeta::new("east", "stray"),
            spec: WorkSpec::default(),
        };
        assert_eq!(work.owner(), None);
    }
}
