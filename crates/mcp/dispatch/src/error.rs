//! Dispatch errors

use mcp_store::StoreError;
use mcp_types::{ObjectKey, ResourceRef};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Manifest {key} for resource {resource} not found")]
    ManifestNotFound { key: ObjectKey, resource: ResourceRef },

    #[error("Failed to write Work {key}: {source}")]
    WorkWrite { key: ObjectKey, source: StoreError },

    #[error("Failed to delete Work {key}: {source}")]
    WorkDelete { key: ObjectKey, source: StoreError },

    #[error("Finalizer bookkeeping for {key} failed: {source}")]
    Bookkeeping { key: ObjectKey, source: StoreError },

    #[error("[{}]", join(.0))]
    Aggregate(Vec<DispatchError>),
}

fn join(errors: &[DispatchError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl DispatchError {
    /// Combine errors; `None` when there are none, the error itself when alone
    pub fn aggregate(errors: impl IntoIterator<Item = DispatchError>) -> Option<Self> {
        let mut errors: Vec<_> = errors
            .into_iter()
            .flat_map(|e| match e {
                Self::Aggregate(inner) => inner,
                other => vec![other],
            })
            .collect();

        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Aggregate(errors)),
        }
    }

    /// Errors contained in this one
    pub fn errors(&self) -> Vec<&DispatchError> {
        match self {
            Self::Aggregate(inner) => inner.iter().collect(),
            other => vec![other],
        }
    }

    /// A referenced Manifest does not exist yet
    pub fn is_referential(&self) -> bool {
        self.errors()
            .iter()
            .any(|e| matches!(e, Self::ManifestNotFound { .. }))
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
