//! Checkpoint store trait and its implementations

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::namespace::{checkpoint_key, CheckpointSet, JobNamespace, DEFAULT_KEY_PREFIX};
use crate::source::RecordId;
use crate::storage::{
    BackendType, HealthStatus, SetBackend, StorageConfig, StorageError, StorageFactory,
    StorageResult,
};

/// Durable record of which ids a job has checked and which have failed.
///
/// All operations are scoped by a [`JobNamespace`]. Marks are idempotent.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Membership test against the checked set
    async fn is_checked(&self, namespace: &JobNamespace, id: RecordId) -> StorageResult<bool>;

    async fn mark_checked(&self, namespace: &JobNamespace, id: RecordId) -> StorageResult<()>;

    async fn mark_failed(&self, namespace: &JobNamespace, id: RecordId) -> StorageResult<()>;

    /// Snapshot of the checked set, unordered
    async fn checked_ids(&self, namespace: &JobNamespace) -> StorageResult<HashSet<RecordId>>;

    /// Snapshot of the failed set, unordered
    async fn failed_ids(&self, namespace: &JobNamespace) -> StorageResult<HashSet<RecordId>>;

    /// Put a time-to-live on both sets. A zero `ttl` leaves them untouched.
    async fn expire(&self, namespace: &JobNamespace, ttl: Duration) -> StorageResult<()>;

    /// Drop both sets so every id reads as unprocessed again
    async fn clear(&self, namespace: &JobNamespace) -> StorageResult<()>;

    /// Key under which `set` is stored for `namespace`
    fn key_for(&self, namespace: &JobNamespace, set: CheckpointSet) -> String;

    /// Health of the underlying backend, or `None` when nothing is persisted
    async fn health(&self) -> StorageResult<Option<HealthStatus>> {
        Ok(None)
    }
}

/// Checkpoint store backed by any [`SetBackend`]
pub struct SetCheckpointStore {
    backend: Arc<dyn SetBackend>,
    prefix: String,
}

impl SetCheckpointStore {
    pub fn new(backend: Arc<dyn SetBackend>) -> Self {
        Self {
            backend,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    /// Override the leading key component
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn backend(&self) -> &Arc<dyn SetBackend> {
        &self.backend
    }

    /// The common setup: Redis, configured from `ONEPASS_*` / `REDIS_URL`
    /// environment variables.
    pub async fn connect_default() -> StorageResult<Self> {
        let config = StorageConfig {
            backend: BackendType::Redis,
            ..StorageConfig::from_env()?
        };
        let prefix = config.key_prefix.clone();
        let backend = StorageFactory::from_config(&config)
            .await?
            .ok_or_else(|| StorageError::configuration("Redis backend was not created"))?;
        Ok(Self::new(backend).with_prefix(prefix))
    }

    async fn read_ids(&self, namespace: &JobNamespace, set: CheckpointSet) -> StorageResult<HashSet<RecordId>> {
        let key = self.key_for(namespace, set);
        let members = self.backend.set_members(&key).await?;

        let mut ids = HashSet::with_capacity(members.len());
        for member in members {
            match member.parse::<RecordId>() {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(_) => warn!(key = %key, member = %member, "Skipping non-numeric checkpoint member"),
            }
        }
        Ok(ids)
    }
}

#[async_trait]
impl CheckpointStore for SetCheckpointStore {
    async fn is_checked(&self, namespace: &JobNamespace, id: RecordId) -> StorageResult<bool> {
        let key = self.key_for(namespace, CheckpointSet::Checked);
        self.backend.set_is_member(&key, &id.to_string()).await
    }

    async fn mark_checked(&self, namespace: &JobNamespace, id: RecordId) -> StorageResult<()> {
        let key = self.key_for(namespace, CheckpointSet::Checked);
        self.backend.set_add(&key, &id.to_string()).await?;
        Ok(())
    }

    async fn mark_failed(&self, namespace: &JobNamespace, id: RecordId) -> StorageResult<()> {
        let key = self.key_for(namespace, CheckpointSet::Failed);
        self.backend.set_add(&key, &id.to_string()).await?;
        Ok(())
    }

    async fn checked_ids(&self, namespace: &JobNamespace) -> StorageResult<HashSet<RecordId>> {
        self.read_ids(namespace, CheckpointSet::Checked).await
    }

    async fn failed_ids(&self, namespace: &JobNamespace) -> StorageResult<HashSet<RecordId>> {
        self.read_ids(namespace, CheckpointSet::Failed).await
    }

    async fn expire(&self, namespace: &JobNamespace, ttl: Duration) -> StorageResult<()> {
        if ttl.is_zero() {
            debug!(job = %namespace, "Checkpoint expiry disabled");
            return Ok(());
        }
        for set in [CheckpointSet::Checked, CheckpointSet::Failed] {
            let key = self.key_for(namespace, set);
            let applied = self.backend.expire(&key, ttl).await?;
            debug!(key = %key, applied, ttl = ?ttl, "Applied checkpoint expiry");
        }
        Ok(())
    }

    async fn clear(&self, namespace: &JobNamespace) -> StorageResult<()> {
        for set in [CheckpointSet::Checked, CheckpointSet::Failed] {
            let key = self.key_for(namespace, set);
            let existed = self.backend.delete(&key).await?;
            debug!(key = %key, existed, "Cleared checkpoint set");
        }
        Ok(())
    }

    fn key_for(&self, namespace: &JobNamespace, set: CheckpointSet) -> String {
        checkpoint_key(&self.prefix, namespace, set)
    }

    async fn health(&self) -> StorageResult<Option<HealthStatus>> {
        self.backend.health_check().await.map(Some)
    }
}

/// Store used when checkpointing is disabled: nothing is ever checked or failed.
#[derive(Debug, Clone, Default)]
pub struct NoopCheckpointStore {
    prefix: Option<String>,
}

impl NoopCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix used only when reporting key names
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

#[async_trait]
impl CheckpointStore for NoopCheckpointStore {
    async fn is_checked(&self, _namespace: &JobNamespace, _id: RecordId) -> StorageResult<bool> {
        Ok(false)
    }

    async fn mark_checked(&self, _namespace: &JobNamespace, _id: RecordId) -> StorageResult<()> {
        Ok(())
    }

    async fn mark_failed(&self, _namespace: &JobNamespace, _id: RecordId) -> StorageResult<()> {
        Ok(())
    }

    async fn checked_ids(&self, _namespace: &JobNamespace) -> StorageResult<HashSet<RecordId>> {
        Ok(HashSet::new())
    }

    async fn failed_ids(&self, _namespace: &JobNamespace) -> StorageResult<HashSet<RecordId>> {
        Ok(HashSet::new())
    }

    async fn expire(&self, _namespace: &JobNamespace, _ttl: Duration) -> StorageResult<()> {
        Ok(())
    }

    async fn clear(&self, _namespace: &JobNamespace) -> StorageResult<()> {
        Ok(())
    }

    fn key_for(&self, namespace: &JobNamespace, set: CheckpointSet) -> String {
        let prefix = self.prefix.as_deref().unwrap_or(DEFAULT_KEY_PREFIX);
        checkpoint_key(prefix, namespace, set)
    }
}

/// Build the checkpoint store described by `config`.
///
/// A `none` backend yields a [`NoopCheckpointStore`].
pub async fn open_store(config: &StorageConfig) -> StorageResult<Arc<dyn CheckpointStore>> {
    Ok(match StorageFactory::from_config(config).await? {
        Some(backend) => {
            Arc::new(SetCheckpointStore::new(backend).with_prefix(config.key_prefix.clone()))
        }
        None => Arc::new(NoopCheckpointStore::with_prefix(config.key_prefix.clone())),
    })
}
