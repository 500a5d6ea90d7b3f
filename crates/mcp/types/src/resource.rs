//! Resource references and manifest key derivation
//!
//! The manifest key is the join between a resource reference and its stored
//! template, so its normalization must stay stable:
//! `lowercase("{group}-{version}-{kind}-{name}")`, where a `group/version`
//! api version contributes `group-version` and a core version (`v1`) only
//! contributes itself.

use crate::ids::ObjectKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to one concrete resource, resolved through its Manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    /// `group/version`, or a bare version for the core group
    pub api_version: String,

    pub kind: String,

    pub namespace: String,

    pub name: String,
}

impl ResourceRef {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Build a reference from a separate api group and version
    pub fn from_parts(
        api_group: &str,
        version: &str,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let api_version = if api_group.is_empty() {
            version.to_string()
        } else {
            format!("{}/{}", api_group, version)
        };
        Self::new(api_version, kind, namespace, name)
    }

    /// Empty for the core group
    pub fn api_group(&self) -> &str {
        match self.api_version.split_once('/') {
            Some((group, _)) => group,
            None => "",
        }
    }

    pub fn version(&self) -> &str {
        match self.api_version.split_once('/') {
            Some((_, version)) => version,
            None => &self.api_version,
        }
    }

    /// Name of the Manifest holding this resource's template
    pub fn manifest_key(&self) -> String {
        let api_version = self.api_version.split('/').collect::<Vec<_>>().join("-");
        format!("{}-{}-{}", api_version, self.kind, self.name).to_lowercase()
    }

    /// Store key of the Manifest, scoped to the reference namespace
    pub fn manifest_object_key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.manifest_key())
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} {}/{}",
            self.api_version, self.kind, self.namespace, self.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_manifest_key_for_grouped_resource() {
        let resource = ResourceRef::from_parts("apps", "v1", "Deployment", "default", "my-nginx");
        assert_eq!(resource.api_version, "apps/v1");
        assert_eq!(resource.manifest_key(), "apps-v1-deployment-my-nginx");
        assert_eq!(
            resource.manifest_object_key(),
            ObjectKey::new("default", "apps-v1-deployment-my-nginx")
        );
    }

    #[test]
    fn test_manifest_key_for_core_resource() {
        let resource = ResourceRef::new("v1", "ConfigMap", "default", "Settings");
        assert_eq!(resource.api_group(), "");
        assert_eq!(resource.version(), "v1");
        assert_eq!(resource.manifest_key(), "v1-configmap-settings");
    }

    #[test]
    fn test_group_and_version_accessors() {
        let resource = ResourceRef::new("networking.k8s.io/v1", "Ingress", "web", "edge");
        assert_eq!(resource.api_group(), "networking.k8s.io");
        assert_eq!(resource.version(), "v1");
        assert_eq!(resource.manifest_key(), "networking.k8s.io-v1-ingress-edge");
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let resource = ResourceRef::new("apps/v1", "Deployment", "default", "web");
        let value = serde_json::to_value(&resource).unwrap();
        assert_eq!(value["apiVersion"], "apps/v1");
    }

    proptest! {
        #[test]
        fn manifest_key_is_lowercase_and_slash_free(
            group in "[a-zA-Z]{0,8}",
            version in "v[0-9]{1,2}",
            kind in "[A-Za-z]{1,12}",
            name in "[a-zA-Z0-9-]{1,16}",
        ) {
            let resource = ResourceRef::from_parts(&group, &version, kind, "ns", name);
            let key = resource.manifest_key();
            prop_assert_eq!(key.clone(), key.to_lowercase());
            prop_assert!(!key.contains('/'));
        }

        #[test]
        fn manifest_key_ignores_case_of_inputs(
            kind in "[A-Za-z]{1,12}",
            name in "[a-zA-Z0-9-]{1,16}",
        ) {
            let upper = ResourceRef::new("apps/v1", kind.to_uppercase(), "ns", name.to_uppercase());
            let lower = ResourceRef::new("apps/v1", kind.to_lowercase(), "ns", name.to_lowercase());
            prop_assert_eq!(upper.manifest_key(), lower.manifest_key());
        }
    }
}
