//! Read-side helpers bound to one job description

use serde::Serialize;
use std::sync::Arc;

use super::namespace::{CheckpointSet, JobNamespace};
use super::store::CheckpointStore;
use crate::source::RecordId;
use crate::storage::{HealthStatus, StorageResult};

/// Checkpoint state of a job, for reporting
#[derive(Debug, Clone, Serialize)]
pub struct CheckpointSummary {
    pub namespace: String,
    pub checked_key: String,
    pub failed_key: String,
    pub checked: usize,
    pub failed: usize,
    /// `None` when checkpointing is disabled
    pub backend: Option<HealthStatus>,
}

/// A checkpoint store viewed through a single job description.
///
/// Lets callers ask whether a job already handled an id, or list what it
/// checked and failed, without running the job.
pub struct JobCheckpoints {
    store: Arc<dyn CheckpointStore>,
    namespace: JobNamespace,
}

impl JobCheckpoints {
    pub fn new(store: Arc<dyn CheckpointStore>, description: &str) -> Self {
        Self {
            store,
            namespace: JobNamespace::from_description(description),
        }
    }

    pub fn namespace(&self) -> &JobNamespace {
        &self.namespace
    }

    pub async fn already_run_for(&self, id: RecordId) -> StorageResult<bool> {
        self.store.is_checked(&self.namespace, id).await
    }

    pub async fn is_failed(&self, id: RecordId) -> StorageResult<bool> {
        Ok(self.store.failed_ids(&self.namespace).await?.contains(&id))
    }

    /// Checked ids in ascending order
    pub async fn checked_ids(&self) -> StorageResult<Vec<RecordId>> {
        let mut ids: Vec<_> = self.store.checked_ids(&self.namespace).await?.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Failed ids in ascending order
    pub async fn failed_ids(&self) -> StorageResult<Vec<RecordId>> {
        let mut ids: Vec<_> = self.store.failed_ids(&self.namespace).await?.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    pub async fn clear(&self) -> StorageResult<()> {
        self.store.clear(&self.namespace).await
    }

    pub async fn summary(&self) -> StorageResult<CheckpointSummary> {
        Ok(CheckpointSummary {
            namespace: self.namespace.to_string(),
            checked_key: self.store.key_for(&self.namespace, CheckpointSet::Checked),
            failed_key: self.store.key_for(&self.namespace, CheckpointSet::Failed),
            checked: self.store.checked_ids(&self.namespace).await?.len(),
            failed: self.store.failed_ids(&self.namespace).await?.len(),
            backend: self.store.health().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{NoopCheckpointStore, SetCheckpointStore};
    use crate::storage::MemoryBackend;

    async fn seeded() -> JobCheckpoints {
        let store = Arc::new(SetCheckpointStore::new(Arc::new(MemoryBackend::new())));
        let ns = JobNamespace::from_description("Reprice Widgets");
        for id in [30, 10, 20] {
            store.mark_checked(&ns, id).await.unwrap();
        }
        store.mark_failed(&ns, 20).await.unwrap();
        JobCheckpoints::new(store, "reprice   widgets")
    }

    #[tokio::test]
    async fn test_already_run_for() {
        let job = seeded().await;
        assert!(job.already_run_for(10).await.unwrap());
        assert!(!job.already_run_for(11).await.unwrap());
        assert!(job.is_failed(20).await.unwrap());
        assert!(!job.is_failed(10).await.unwrap());
    }

    #[tokio::test]
    async fn test_ids_are_sorted() {
        let job = seeded().await;
        assert_eq!(job.checked_ids().await.unwrap(), vec![10, 20, 30]);
        assert_eq!(job.failed_ids().await.unwrap(), vec![20]);
    }

    #[tokio::test]
    async fn test_summary_and_clear() {
        let job = seeded().await;
        let summary = job.summary().await.unwrap();
        assert_eq!(summary.namespace, "reprice_widgets");
        assert_eq!(summary.checked_key, "one_timer_script:reprice_widgets:checked");
        assert_eq!(summary.checked, 3);
        assert_eq!(summary.failed, 1);
        assert!(summary.backend.as_ref().is_some_and(|h| h.healthy));

        job.clear().await.unwrap();
        let summary = job.summary().await.unwrap();
        assert_eq!((summary.checked, summary.failed), (0, 0));
    }

    #[tokio::test]
    async fn test_summary_without_backend() {
        let job = JobCheckpoints::new(Arc::new(NoopCheckpointStore::new()), "anything");
        let summary = job.summary().await.unwrap();
        assert!(summary.backend.is_none());
        assert_eq!(summary.checked, 0);
    }
}
