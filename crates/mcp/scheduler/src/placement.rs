//! Placement policy

use mcp_types::{DeployableSpec, PlacementDecision};

/// Replicate the full resource list to every target cluster
///
/// Returns no decisions when there are no clusters or no resources; that
/// placement is vacuously satisfied.
pub fn decide(spec: &DeployableSpec) -> Vec<PlacementDecision> {
    if spec.placement.cluster_names.is_empty() || spec.resources.is_empty() {
        return Vec::new();
    }

    spec.placement
        .cluster_names
        .iter()
        .map(|cluster| PlacementDecision {
            cluster: cluster.clone(),
            resources: spec.resources.clone(),
        })
        .collect()
}
