//! Lease-based leader election
//!
//! Only the instance holding the lease for a lock runs its controllers.
//! Standbys keep polling `try_acquire` and take over once the lease
//! expires or is released.

pub mod memory;

pub use memory::InMemoryLeaderElector;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Outcome of an acquisition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadershipResult {
    Acquired {
        /// Token required to renew or release the lease
        lease_token: String,
        lease_duration: Duration,
    },
    NotLeader {
        current_leader: Option<String>,
    },
}

impl LeadershipResult {
    #[must_use]
    pub const fn is_leader(&self) -> bool {
        matches!(self, Self::Acquired { .. })
    }

    #[must_use]
    pub fn lease_token(&self) -> Option<&str> {
        match self {
            Self::Acquired { lease_token, .. } => Some(lease_token),
            Self::NotLeader { .. } => None,
        }
    }
}

/// Outcome of a renewal attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalResult {
    Renewed { lease_duration: Duration },

    /// The lease expired or another instance took it
    Lost,

    InvalidToken,
}

impl RenewalResult {
    #[must_use]
    pub const fn is_renewed(&self) -> bool {
        matches!(self, Self::Renewed { .. })
    }
}

/// Leader election backend
///
/// `lock` names the lease (for example `mcp-system/scheduler.mcp.io`),
/// `holder` identifies the competing instance.
#[async_trait]
pub trait LeaderElector: Send + Sync {
    /// Acquire the lease, or re-acquire it when already held by `holder`
    async fn try_acquire(&self, lock: &str, holder: &str) -> Result<LeadershipResult>;

    /// Extend a held lease; must happen before it expires
    async fn renew(&self, lock: &str, lease_token: &str) -> Result<RenewalResult>;

    /// Give the lease up so a standby can take over without waiting
    async fn release(&self, lock: &str, lease_token: &str) -> Result<bool>;

    async fn current_leader(&self, lock: &str) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leadership_result_accessors() {
        let acquired = LeadershipResult::Acquired {
            lease_token: "token".to_string(),
            lease_duration: Duration::from_secs(15),
        };
        assert!(acquired.is_leader());
        assert_eq!(acquired.lease_token(), Some("token"));

        let standby = LeadershipResult::NotLeader {
            current_leader: Some("mcpd-a".to_string()),
        };
        assert!(!standby.is_leader());
        assert_eq!(standby.lease_token(), None);
    }

    #[test]
    fn test_renewal_result_is_renewed() {
        assert!(RenewalResult::Renewed {
            lease_duration: Duration::from_secs(15)
        }
        .is_renewed());
        assert!(!RenewalResult::Lost.is_renewed());
        assert!(!RenewalResult::InvalidToken.is_renewed());
    }
}
