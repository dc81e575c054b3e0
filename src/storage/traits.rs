//! Core trait definitions for the storage abstraction layer

use async_trait::async_trait;
use std::time::Duration;

use super::error::StorageResult;
use super::types::HealthStatus;

/// Named-set key-value backend.
///
/// This is the whole surface the checkpoint store needs from Redis or any
/// equivalent store: set-add, membership, member snapshot, and a time-to-live
/// on a named key. Members are opaque strings.
#[async_trait]
pub trait SetBackend: Send + Sync {
    /// Add `member` to the set at `key`. Returns true if it was not present.
    async fn set_add(&self, key: &str, member: &str) -> StorageResult<bool>;

    /// Membership test against the set at `key`
    async fn set_is_member(&self, key: &str, member: &str) -> StorageResult<bool>;

    /// Snapshot of all members of the set at `key`, in no particular order
    async fn set_members(&self, key: &str) -> StorageResult<Vec<String>>;

    /// Give `key` a time-to-live. Returns false if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> StorageResult<bool>;

    /// Remove `key` entirely. Returns true if it existed.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check the health of the storage backend
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Short backend name used in logs and health reports
    fn backend_type(&self) -> &'static str;
}
