//! Record store collaborator

use async_trait::async_trait;

/// Primary identifier of a record
pub type RecordId = i64;

/// A record that knows its own identifier
pub trait Identified {
    fn record_id(&self) -> RecordId;
}

/// Access to the records a job iterates over.
///
/// Any table, index or service that supports these three reads can feed the
/// engine. Errors abort the run.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    type Record: Identified + Send + Sync;

    /// Ordered scan: records with id `>= start`, ascending, at most `limit`.
    async fn find_from(&self, start: RecordId, limit: usize) -> anyhow::Result<Vec<Self::Record>>;

    /// Records whose ids are in `ids`. Order is not significant and unknown
    /// ids are simply absent from the result.
    async fn find_by_ids(&self, ids: &[RecordId]) -> anyhow::Result<Vec<Self::Record>>;

    /// Single lookup by primary identifier
    async fn find_by_id(&self, id: RecordId) -> anyhow::Result<Option<Self::Record>> {
        Ok(self.find_by_ids(&[id]).await?.into_iter().next())
    }
}
