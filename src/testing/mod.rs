//! Testing utilities
//!
//! In-memory stand-ins for a record store and for the output sink, used by
//! the unit tests, the integration tests and the benchmarks.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::engine::OutputSink;
use crate::source::{Identified, RecordId, RecordRepository};

/// Sample record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    pub id: RecordId,
    pub name: String,
}

impl Widget {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            name: format!("widget-{id}"),
        }
    }
}

impl Identified for Widget {
    fn record_id(&self) -> RecordId {
        self.id
    }
}

/// Ordered in-memory repository that counts the queries made against it
pub struct InMemoryRepository<R> {
    records: BTreeMap<RecordId, R>,
    failure: Option<String>,
    scans: AtomicUsize,
    filtered_queries: AtomicUsize,
    single_lookups: AtomicUsize,
}

impl<R: Identified> InMemoryRepository<R> {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            failure: None,
            scans: AtomicUsize::new(0),
            filtered_queries: AtomicUsize::new(0),
            single_lookups: AtomicUsize::new(0),
        }
    }

    pub fn from_records(records: impl IntoIterator<Item = R>) -> Self {
        let mut repository = Self::new();
        for record in records {
            repository.insert(record);
        }
        repository
    }

    pub fn insert(&mut self, record: R) {
        self.records.insert(record.record_id(), record);
    }

    /// Make every query fail with `message`
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of `find_from` calls
    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    /// Number of `find_by_ids` calls
    pub fn filtered_queries(&self) -> usize {
        self.filtered_queries.load(Ordering::SeqCst)
    }

    /// Number of `find_by_id` calls
    pub fn single_lookups(&self) -> usize {
        self.single_lookups.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> anyhow::Result<()> {
        match &self.failure {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

impl<R: Identified> Default for InMemoryRepository<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R> RecordRepository for InMemoryRepository<R>
where
    R: Identified + Clone + Send + Sync,
{
    type Record = R;

    async fn find_from(&self, start: RecordId, limit: usize) -> anyhow::Result<Vec<R>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self
            .records
            .range(start..)
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn find_by_ids(&self, ids: &[RecordId]) -> anyhow::Result<Vec<R>> {
        self.filtered_queries.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(ids
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect())
    }

    async fn find_by_id(&self, id: RecordId) -> anyhow::Result<Option<R>> {
        self.single_lookups.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.records.get(&id).cloned())
    }
}

/// Clonable in-memory writer; every clone appends to the same buffer
#[derive(Clone, Default)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output sink writing into this buffer
    pub fn sink(&self) -> OutputSink {
        OutputSink::new(self.clone())
    }

    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buffer).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
