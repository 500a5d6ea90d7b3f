//! Store error types

use mcp_types::{ObjectKey, RecordKind};
use thiserror::Error;

/// Store errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: RecordKind, key: ObjectKey },

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: RecordKind, key: ObjectKey },

    #[error("Version conflict on {kind} {key}: expected {expected}, found {actual}")]
    Conflict {
        kind: RecordKind,
        key: ObjectKey,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid write to {kind} {key}: {reason}")]
    Invalid {
        kind: RecordKind,
        key: ObjectKey,
        reason: String,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store operation timed out: {0}")]
    Timeout(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Transient failures a caller should retry by requeueing
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict { .. } | StoreError::Unavailable(_) | StoreError::Timeout(_)
        )
    }
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let key = ObjectKey::new("east", "default-web");
        let not_found = StoreError::NotFound {
            kind: RecordKind::Work,
            key: key.clone(),
        };
        assert!(not_found.is_not_found());
        assert!(!not_found.is_retriable());

        let conflict = StoreError::Conflict {
            kind: RecordKind::Work,
            key,
            expected: 3,
            actual: 4,
        };
        assert!(conflict.is_conflict());
        assert!(conflict.is_retriable());

        assert!(StoreError::Unavailable("down".into()).is_retriable());
    }

    #[test]
    fn test_display() {
        let err = StoreError::NotFound {
            kind: RecordKind::Manifest,
            key: ObjectKey::new("default", "apps-v1-deployment-web"),
        };
        assert_eq!(
            err.to_string(),
            "Manifest default/apps-v1-deployment-web not found"
        );
    }
}
