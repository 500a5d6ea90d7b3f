//! Deployable - declared intent mapping resources to target clusters
//!
//! The spec is written by users. The status is owned by the scheduler
//! (`placement_decided`, `placement_decisions`) and the dispatch controller
//! (`applied`). Once a placement is decided it is never re-scheduled.

use crate::meta::ObjectMeta;
use crate::record::{Record, RecordKind};
use crate::resource::ResourceRef;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Declared intent record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployable {
    pub metadata: ObjectMeta,

    pub spec: DeployableSpec,

    #[serde(default)]
    pub status: DeployableStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployableSpec {
    #[serde(default)]
    pub placement: Placement,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    /// Target clusters, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployableStatus {
    /// Set once by the scheduler
    #[serde(default)]
    pub placement_decided: bool,

    /// Set by the dispatch controller once every Work is written
    #[serde(default)]
    pub applied: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub placement_decisions: Vec<PlacementDecision>,
}

/// Resources assigned to one target cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementDecision {
    pub cluster: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceRef>,
}

/// Rejected Deployable input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Deployable namespace and name must be set")]
    MissingIdentity,

    #[error("Cluster name at index {0} is empty")]
    EmptyClusterName(usize),

    #[error("Resource at index {index} is missing {field}")]
    IncompleteResource { index: usize, field: &'static str },
}

impl Deployable {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: DeployableSpec::default(),
            status: DeployableStatus::default(),
        }
    }

    pub fn with_clusters<I, S>(mut self, clusters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.placement.cluster_names = clusters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_resources(mut self, resources: impl IntoIterator<Item = ResourceRef>) -> Self {
        self.spec.resources = resources.into_iter().collect();
        self
    }

    /// Name shared by every Work derived from this Deployable
    pub fn work_name(&self) -> String {
        format!("{}-{}", self.metadata.namespace, self.metadata.name)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.metadata.namespace.is_empty() || self.metadata.name.is_empty() {
            return Err(ValidationError::MissingIdentity);
        }

        if let Some(index) = self
            .spec
            .placement
            .cluster_names
            .iter()
            .position(|c| c.is_empty())
        {
            return Err(ValidationError::EmptyClusterName(index));
        }

        for (index, resource) in self.spec.resources.iter().enumerate() {
            let missing = if resource.api_version.is_empty() {
                Some("apiVersion")
            } else if resource.kind.is_empty() {
                Some("kind")
            } else if resource.name.is_empty() {
                Some("name")
            } else {
                None
            };
            if let Some(field) = missing {
                return Err(ValidationError::IncompleteResource { index, field });
            }
        }

        Ok(())
    }
}

impl Record for Deployable {
    const KIND: RecordKind = RecordKind::Deployable;

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

    fn nginx() -> ResourceRef {
        ResourceRef::new("apps/v1", "Deployment", "default", "my-nginx")
    }

    #[test]
    fn test_work_name() {
        let deployable = Deployable::new("default", "web");
        assert_eq!(deployable.work_name(), "default-web");
    }

    #[test]
    fn test_validate() {
        let deployable = Deployable::new("default", "web")
            .with_clusters(["east", "west"])
            .with_resources([nginx()]);
        assert!(deployable.validate().is_ok());

        let empty_cluster = Deployable::new("default", "web").with_clusters(["east", ""]);
        assert_eq!(
            empty_cluster.validate(),
            Err(ValidationError::EmptyClusterName(1))
        );

        let mut bad = nginx();
        bad.kind.clear();
        let bad_resource = Deployable::new("default", "web").with_resources([bad]);
        assert_eq!(
            bad_resource.validate(),
            Err(ValidationError::IncompleteResource {
                index: 0,
                field: "kind"
            })
        );
    }

    #[test]
    fn test_status_defaults_when_absent() {
        let json = serde_json::json!({
            "metadata": { "namespace": "default", "name": "web" },
            "spec": { "placement": { "clusterNames": ["east"] } }
        });
        let deployable: Deployable = serde_json::from_value(json).unwrap();
        assert!(!deployable.status.placement_decided);
        assert!(!deployable.status.applied);
        assert_eq!(deployable.spec.placement.cluster_names, vec!["east"]);
    }
}
