//! Seed data loaded into the store at startup
//!
//! ```json
//! {
//!   "manifests": [
//!     {
//!       "resource": {"apiVersion": "apps/v1", "kind": "Deployment", "namespace": "default", "name": "my-nginx"},
//!       "template": {"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "my-nginx"}}
//!     }
//!   ],
//!   "deployables": [
//!     {
//!       "metadata": {"namespace": "default", "name": "web"},
//!       "spec": {
//!         "placement": {"clusterNames": ["east", "west"]},
//!         "resources": [{"apiVersion": "apps/v1", "kind": "Deployment", "namespace": "default", "name": "my-nginx"}]
//!       }
//!     }
//!   ]
//! }
//! ```

use crate::error::{DaemonError, DaemonResult};
use mcp_store::{create_or_update, RecordStore, ResourceStore};
use mcp_types::{Deployable, Manifest, ResourceRef};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// A resource template, stored under the key derived from its reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedManifest {
    pub resource: ResourceRef,
    pub template: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub manifests: Vec<SeedManifest>,

    #[serde(default)]
    pub deployables: Vec<Deployable>,
}

/// What applying a seed file changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub manifests: usize,
    pub deployables_created: usize,
    pub deployables_existing: usize,
}

impl SeedFile {
    pub fn load(path: impl AsRef<Path>) -> DaemonResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DaemonError::Seed(format!("cannot read {}: {}", path.display(), e)))?;
        let seed: SeedFile = serde_json::from_str(&raw)?;
        seed.validate()?;
        Ok(seed)
    }

    pub fn validate(&self) -> DaemonResult<()> {
        for deployable in &self.deployables {
            deployable.validate().map_err(|e| {
                DaemonError::Seed(format!(
                    "deployable {}: {}",
                    deployable.metadata.key(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Write the seed into the store
    ///
    /// Manifest templates are overwritten. Deployables that already exist are
    /// left untouched so their status survives a restart with the same seed.
    pub async fn apply<S>(&self, store: &S) -> DaemonResult<SeedReport>
    where
        S: ResourceStore + ?Sized,
    {
        let mut report = SeedReport::default();

        for entry in &self.manifests {
            let manifest = Manifest::for_resource(&entry.resource, entry.template.clone());
            let key = manifest.metadata.key();
            let template = entry.template.clone();
            let result = create_or_update(store, manifest, |current: &mut Manifest| {
                current.template = template.clone();
            })
            .await?;
            debug!(key = %key, result = ?result, "Manifest seeded");
            report.manifests += 1;
        }

        for deployable in &self.deployables {
            let mut fresh = deployable.clone();
            fresh.metadata.resource_version = 0;
            fresh.metadata.deletion_requested_at = None;
            let key = fresh.metadata.key();

            match RecordStore::<Deployable>::create(store, fresh).await {
                Ok(_) => {
                    debug!(key = %key, "Deployable seeded");
                    report.deployables_created += 1;
                }
                Err(mcp_store::StoreError::AlreadyExists { .. }) => {
                    report.deployables_existing += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            manifests = report.manifests,
            deployables = report.deployables_created,
            existing = report.deployables_existing,
            "Seed applied"
        );
        Ok(report)
    }
}
