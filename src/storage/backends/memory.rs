//! In-memory storage backend for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::storage::{
    error::StorageResult,
    traits::SetBackend,
    types::{expiry_from_now, ConnectionStatus, ExpiringSet, HealthStatus},
};

/// In-memory storage backend for testing
///
/// Cloning shares the underlying sets, so a clone handed to one run and
/// another kept by the test observe the same state.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    sets: Arc<RwLock<HashMap<String, ExpiringSet>>>,
}

impl MemoryBackend {
    /// Create a new, empty memory backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub async fn key_count(&self) -> usize {
        self.sets
            .read()
            .await
            .values()
            .filter(|set| !set.is_expired())
            .count()
    }

    /// Remaining time-to-live on `key`, if one is set
    pub async fn ttl(&self, key: &str) -> Option<chrono::Duration> {
        let sets = self.sets.read().await;
        let set = sets.get(key).filter(|set| !set.is_expired())?;
        set.expires_at.map(|at| at - chrono::Utc::now())
    }
}

#[async_trait]
impl SetBackend for MemoryBackend {
    async fn set_add(&self, key: &str, member: &str) -> StorageResult<bool> {
        let mut sets = self.sets.write().await;
        let set = sets.entry(key.to_string()).or_default();
        if set.is_expired() {
            *set = ExpiringSet::default();
        }
        Ok(set.members.insert(member.to_string()))
    }

    async fn set_is_member(&self, key: &str, member: &str) -> StorageResult<bool> {
        let sets = self.sets.read().await;
        Ok(sets
            .get(key)
            .filter(|set| !set.is_expired())
            .is_some_and(|set| set.members.contains(member)))
    }

    async fn set_members(&self, key: &str) -> StorageResult<Vec<String>> {
        let sets = self.sets.read().await;
        Ok(sets
            .get(key)
            .filter(|set| !set.is_expired())
            .map(|set| set.members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StorageResult<bool> {
        let mut sets = self.sets.write().await;
        let expired = match sets.get(key) {
            Some(set) => set.is_expired(),
            None => return Ok(false),
        };
        if expired {
            sets.remove(key);
            return Ok(false);
        }
        if let Some(set) = sets.get_mut(key) {
            set.expires_at = Some(expiry_from_now(ttl));
        }
        Ok(true)
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let removed = self.sets.write().await.remove(key);
        Ok(removed.is_some_and(|set| !set.is_expired()))
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Ok(HealthStatus {
            healthy: true,
            backend_type: self.backend_type().to_string(),
            connection_status: ConnectionStatus::Connected,
            latency_ms: 0,
            errors: vec![],
        })
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_add_is_idempotent() {
        let backend = MemoryBackend::new();

        assert!(backend.set_add("jobs:checked", "7").await.unwrap());
        assert!(!backend.set_add("jobs:checked", "7").await.unwrap());
        assert_eq!(backend.set_members("jobs:checked").await.unwrap(), vec!["7"]);
    }

    #[tokio::test]
    async fn test_membership_is_per_key() {
        let backend = MemoryBackend::new();
        backend.set_add("a", "1").await.unwrap();

        assert!(backend.set_is_member("a", "1").await.unwrap());
        assert!(!backend.set_is_member("a", "2").await.unwrap());
        assert!(!backend.set_is_member("b", "1").await.unwrap());
    }

    #[tokio::test]
    async fn test_expire_missing_key_returns_false() {
        let backend = MemoryBackend::new();
        assert!(!backend.expire("nope", Duration::from_secs(10)).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_set_reads_empty() {
        let backend = MemoryBackend::new();
        backend.set_add("short", "1").await.unwrap();
        assert!(backend.expire("short", Duration::ZERO).await.unwrap());

        assert!(!backend.set_is_member("short", "1").await.unwrap());
        assert!(backend.set_members("short").await.unwrap().is_empty());
        assert_eq!(backend.key_count().await, 0);

        // Re-adding after expiry starts a fresh set without the old TTL
        backend.set_add("short", "2").await.unwrap();
        assert_eq!(backend.set_members("short").await.unwrap(), vec!["2"]);
        assert!(backend.ttl("short").await.is_none());
    }

    #[tokio::test]
    async fn test_ttl_is_reported() {
        let backend = MemoryBackend::new();
        backend.set_add("k", "1").await.unwrap();
        backend.expire("k", Duration::from_secs(3600)).await.unwrap();

        let ttl = backend.ttl("k").await.unwrap();
        assert!(ttl > chrono::Duration::seconds(3500));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let backend = MemoryBackend::new();
        let clone = backend.clone();
        clone.set_add("shared", "x").await.unwrap();

        assert!(backend.set_is_member("shared", "x").await.unwrap());
        assert!(backend.delete("shared").await.unwrap());
        assert!(!clone.delete("shared").await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check() {
        let health = MemoryBackend::new().health_check().await.unwrap();
        assert!(health.healthy);
        assert_eq!(health.backend_type, "memory");
    }
}
