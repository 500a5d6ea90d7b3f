//! Single-process leader elector
//!
//! Leases live in process memory, so this only coordinates tasks inside one
//! `mcpd` process. It backs tests and the in-memory development mode.

use super::{LeaderElector, LeadershipResult, RenewalResult};
use crate::error::{ControllerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Lease {
    holder: String,
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct InMemoryLeaderElector {
    leases: RwLock<HashMap<String, Lease>>,
    lease_duration: Duration,
}

impl Default for InMemoryLeaderElector {
    fn default() -> Self {
        Self::new(Duration::from_secs(15))
    }
}

fn poisoned<T>(_: PoisonError<T>) -> ControllerError {
    ControllerError::Lease("lease table lock poisoned".to_string())
}

impl InMemoryLeaderElector {
    #[must_use]
    pub fn new(lease_duration: Duration) -> Self {
        Self {
            leases: RwLock::new(HashMap::new()),
            lease_duration,
        }
    }

    fn expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::from_std(self.lease_duration)
            .unwrap_or_else(|_| chrono::Duration::seconds(15))
    }

    fn grant(&self, holder: &str, now: DateTime<Utc>) -> Lease {
        Lease {
            holder: holder.to_string(),
            token: Uuid::new_v4().to_string(),
            expires_at: self.expiry(now),
        }
    }
}

#[async_trait]
impl LeaderElector for InMemoryLeaderElector {
    async fn try_acquire(&self, lock: &str, holder: &str) -> Result<LeadershipResult> {
        let mut leases = self.leases.write().map_err(poisoned)?;
        let now = Utc::now();

        if let Some(lease) = leases.get(lock) {
            if lease.expires_at > now && lease.holder != holder {
                return Ok(LeadershipResult::NotLeader {
                    current_leader: Some(lease.holder.clone()),
                });
            }
        }

        let lease = self.grant(holder, now);
        let lease_token = lease.token.clone();
        leases.insert(lock.to_string(), lease);

        Ok(LeadershipResult::Acquired {
            lease_token,
            lease_duration: self.lease_duration,
        })
    }

    async fn renew(&self, lock: &str, lease_token: &str) -> Result<RenewalResult> {
        let mut leases = self.leases.write().map_err(poisoned)?;
        let now = Utc::now();
        let expires_at = self.expiry(now);

        let Some(lease) = leases.get_mut(lock) else {
            return Ok(RenewalResult::Lost);
        };
        if lease.token != lease_token {
            return Ok(RenewalResult::InvalidToken);
        }
        if lease.expires_at <= now {
            return Ok(RenewalResult::Lost);
        }

        lease.expires_at = expires_at;
        Ok(RenewalResult::Renewed {
            lease_duration: self.lease_duration,
        })
    }

    async fn release(&self, lock: &str, lease_token: &str) -> Result<bool> {
        let mut leases = self.leases.write().map_err(poisoned)?;
        match leases.get(lock) {
            Some(lease) if lease.token == lease_token => {
                leases.remove(lock);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn current_leader(&self, lock: &str) -> Result<Option<String>> {
        let leases = self.leases.read().map_err(poisoned)?;
        let now = Utc::now();
        Ok(leases
            .get(lock)
            .filter(|lease| lease.expires_at > now)
            .map(|lease| lease.holder.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCK: &str = "mcp-system/scheduler.mcp.io";

    #[tokio::test]
    async fn test_second_holder_is_standby() {
        let elector = InMemoryLeaderElector::default();

        let first = elector.try_acquire(LOCK, "mcpd-a").await.unwrap();
        assert!(first.is_leader());

        let second = elector.try_acquire(LOCK, "mcpd-b").await.unwrap();
        assert_eq!(
            second,
            LeadershipResult::NotLeader {
                current_leader: Some("mcpd-a".to_string())
            }
        );
        assert_eq!(
            elector.current_leader(LOCK).await.unwrap().as_deref(),
            Some("mcpd-a")
        );
    }

    #[tokio::test]
    async fn test_renew_requires_matching_token() {
        let elector = InMemoryLeaderElector::default();
        let acquired = elector.try_acquire(LOCK, "mcpd-a").await.unwrap();
        let token = acquired.lease_token().unwrap().to_string();

        assert!(elector.renew(LOCK, &token).await.unwrap().is_renewed());
        assert_eq!(
            elector.renew(LOCK, "bogus").await.unwrap(),
            RenewalResult::InvalidToken
        );
        assert_eq!(
            elector.renew("mcp-system/other", &token).await.unwrap(),
            RenewalResult::Lost
        );
    }

    #[tokio::test]
    async fn test_release_hands_over() {
        let elector = InMemoryLeaderElector::default();
        let acquired = elector.try_acquire(LOCK, "mcpd-a").await.unwrap();
        let token = acquired.lease_token().unwrap().to_string();

        assert!(!elector.release(LOCK, "bogus").await.unwrap());
        assert!(elector.release(LOCK, &token).await.unwrap());
        assert!(elector.current_leader(LOCK).await.unwrap().is_none());

        let next = elector.try_acquire(LOCK, "mcpd-b").await.unwrap();
        assert!(next.is_leader());
    }

    #[tokio::test]
    async fn test_expired_lease_can_be_taken() {
        let elector = InMemoryLeaderElector::new(Duration::from_millis(20));
        let acquired = elector.try_acquire(LOCK, "mcpd-a").await.unwrap();
        let token = acquired.lease_token().unwrap().to_string();

        std::thread::sleep(Duration::from_millis(40));

        assert!(elector.current_leader(LOCK).await.unwrap().is_none());
        assert_eq!(
            elector.renew(LOCK, &token).await.unwrap(),
            RenewalResult::Lost
        );
        assert!(elector.try_acquire(LOCK, "mcpd-b").await.unwrap().is_leader());
    }
}
