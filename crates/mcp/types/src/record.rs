//! Static registry of stored record kinds

use crate::ids::ObjectKey;
use crate::meta::ObjectMeta;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

/// Every kind of record the store holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Deployable,
    Manifest,
    Work,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [RecordKind::Manifest, RecordKind::Deployable, RecordKind::Work];

    pub fn api_version(&self) -> &'static str {
        match self {
            RecordKind::Deployable | RecordKind::Manifest => "apps.mcp.io/v1alpha1",
            RecordKind::Work => "work.open-cluster-management.io/v1",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Deployable => "Deployable",
            RecordKind::Manifest => "Manifest",
            RecordKind::Work => "ManifestWork",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A storable record: ties a Rust type to its kind and metadata
pub trait Record:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: RecordKind;

    fn metadata(&self) -> &ObjectMeta;

    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    fn key(&self) -> ObjectKey {
        self.metadata().key()
    }
}
