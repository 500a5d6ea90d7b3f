//! Well-known marker and label names

/// Finalizer owned by the dispatch controller on every Deployable.
pub const DEPLOYABLE_FINALIZER: &str = "deployable/apps.mcp.io";

/// Label on a Work naming the namespace of the owning Deployable.
pub const DEPLOYABLE_LABEL_NAMESPACE: &str = "deployable.apps.mcp.io/namespace";
/// Label on a Work naming the owning Deployable.
pub const DEPLOYABLE_LABEL_NAME: &str = "deployable.apps.mcp.io/name";

// A stored manifest looks like:
//
//   apiVersion: apps.mcp.io/v1alpha1
//   kind: Manifest
//   metadata:
//     name: apps-v1-deployment-my-nginx
//     namespace: default
//     labels:
//       manifest.apps.mcp.io/apiGroup: apps
//       manifest.apps.mcp.io/apiVersion: v1
//       manifest.apps.mcp.io/kind: Deployment
//       manifest.apps.mcp.io/namespace: default
//       manifest.apps.mcp.io/name: my-nginx
pub const MANIFEST_LABEL_API_GROUP: &str = "manifest.apps.mcp.io/apiGroup";
pub const MANIFEST_LABEL_API_VERSION: &str = "manifest.apps.mcp.io/apiVersion";
pub const MANIFEST_LABEL_KIND: &str = "manifest.apps.mcp.io/kind";
pub const MANIFEST_LABEL_NAMESPACE: &str = "manifest.apps.mcp.io/namespace";
pub const MANIFEST_LABEL_NAME: &str = "manifest.apps.mcp.io/name";

/// Namespace holding cluster-scoped deployables and leader-election locks.
pub const SYSTEM_NAMESPACE: &str = "mcp-system";
