//! Manifest - stored raw template for one concrete resource

use crate::constants::{
    MANIFEST_LABEL_API_GROUP, MANIFEST_LABEL_API_VERSION, MANIFEST_LABEL_KIND,
    MANIFEST_LABEL_NAME, MANIFEST_LABEL_NAMESPACE,
};
use crate::meta::ObjectMeta;
use crate::record::{Record, RecordKind};
use crate::resource::ResourceRef;
use serde::{Deserialize, Serialize};

/// Raw resource template, keyed by [`ResourceRef::manifest_key`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub metadata: ObjectMeta,

    /// The raw resource body handed to the remote agent
    pub template: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<serde_json::Value>,
}

impl Manifest {
    /// Build the Manifest for a resource, named and labelled from its reference
    pub fn for_resource(resource: &ResourceRef, template: serde_json::Value) -> Self {
        let metadata = ObjectMeta::new(resource.namespace.clone(), resource.manifest_key())
            .with_label(MANIFEST_LABEL_API_GROUP, resource.api_group())
            .with_label(MANIFEST_LABEL_API_VERSION, resource.version())
            .with_label(MANIFEST_LABEL_KIND, resource.kind.clone())
            .with_label(MANIFEST_LABEL_NAMESPACE, resource.namespace.clone())
            .with_label(MANIFEST_LABEL_NAME, resource.name.clone());

        Self {
            metadata,
            template,
            status: None,
        }
    }
}

impl Record for Manifest {
    const KIND: RecordKind = RecordKind::Manifest;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
