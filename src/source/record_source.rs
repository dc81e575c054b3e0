//! Batched iteration over a record repository

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

use super::batch::{Batch, RecordSlot};
use super::repository::{Identified, RecordId, RecordRepository};
use super::strategy::{ListLookup, SourceStrategy};

enum Cursor {
    List { ids: Vec<RecordId>, position: usize },
    Range { next: RecordId, end: RecordId, done: bool },
    Query { next: RecordId, exhausted: bool },
}

/// Produces the records of one run, one batch at a time
pub struct RecordSource<R> {
    repository: Arc<dyn RecordRepository<Record = R>>,
    lookup: ListLookup,
    batch_size: usize,
    cursor: Cursor,
}

impl<R> RecordSource<R>
where
    R: Identified + Send + Sync + 'static,
{
    /// `batch_size` is clamped to at least 1. A list keeps only the first
    /// occurrence of each id.
    pub fn new(
        strategy: SourceStrategy,
        repository: Arc<dyn RecordRepository<Record = R>>,
        lookup: ListLookup,
        batch_size: usize,
    ) -> Self {
        let cursor = match strategy {
            SourceStrategy::List(ids) => Cursor::List {
                ids: first_occurrences(ids),
                position: 0,
            },
            SourceStrategy::Range { start, end } => Cursor::Range {
                next: start,
                end,
                done: start > end,
            },
            SourceStrategy::Query { start } => Cursor::Query {
                next: start,
                exhausted: false,
            },
        };

        Self {
            repository,
            lookup,
            batch_size: batch_size.max(1),
            cursor,
        }
    }

    /// Next batch in source order, or `None` once the source is exhausted
    pub async fn next_batch(&mut self) -> anyhow::Result<Option<Batch<R>>> {
        let batch_size = self.batch_size;
        match &mut self.cursor {
            Cursor::List { ids, position } => {
                if *position >= ids.len() {
                    return Ok(None);
                }
                let end = (*position + batch_size).min(ids.len());
                let chunk = ids[*position..end].to_vec();
                *position = end;
                self.resolve(chunk).await.map(Some)
            }
            Cursor::Range { next, end, done } => {
                if *done {
                    return Ok(None);
                }
                let span = i64::try_from(batch_size - 1).unwrap_or(i64::MAX);
                let last = next.saturating_add(span).min(*end);
                let chunk: Vec<RecordId> = (*next..=last).collect();
                if last >= *end {
                    *done = true;
                } else {
                    *next = last + 1;
                }
                self.resolve(chunk).await.map(Some)
            }
            Cursor::Query { next, exhausted } => {
                if *exhausted {
                    return Ok(None);
                }
                let start = *next;
                let records = self.repository.find_from(start, batch_size).await?;
                trace!(start, fetched = records.len(), "Fetched query page");

                match records.iter().map(Identified::record_id).max() {
                    None => {
                        *exhausted = true;
                        return Ok(None);
                    }
                    Some(max_id) => {
                        if records.len() < batch_size || max_id == RecordId::MAX {
                            *exhausted = true;
                        } else {
                            *next = max_id + 1;
                        }
                    }
                }

                let slots = records
                    .into_iter()
                    .map(|record| RecordSlot::found(record.record_id(), record))
                    .collect();
                Ok(Some(Batch::new(slots)))
            }
        }
    }

    async fn resolve(&self, ids: Vec<RecordId>) -> anyhow::Result<Batch<R>> {
        let slots = match self.lookup {
            ListLookup::Filtered => {
                let mut found: HashMap<RecordId, R> = self
                    .repository
                    .find_by_ids(&ids)
                    .await?
                    .into_iter()
                    .map(|record| (record.record_id(), record))
                    .collect();
                ids.into_iter()
                    .map(|id| RecordSlot {
                        id,
                        record: found.remove(&id),
                    })
                    .collect()
            }
            ListLookup::PerId => {
                let mut slots = Vec::with_capacity(ids.len());
                for id in ids {
                    let record = self.repository.find_by_id(id).await?;
                    slots.push(RecordSlot { id, record });
                }
                slots
            }
        };

        let batch = Batch::new(slots);
        debug!(size = batch.len(), missing = batch.missing().len(), "Resolved id batch");
        Ok(batch)
    }
}

fn first_occurrences(ids: Vec<RecordId>) -> Vec<RecordId> {
    let given = ids.len();
    let mut seen = HashSet::with_capacity(given);
    let unique: Vec<_> = ids.into_iter().filter(|id| seen.insert(*id)).collect();
    if unique.len() < given {
        debug!(given, kept = unique.len(), "Dropped repeated ids from list");
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryRepository, Widget};

    fn repository(ids: impl IntoIterator<Item = RecordId>) -> Arc<InMemoryRepository<Widget>> {
        Arc::new(InMemoryRepository::from_records(
            ids.into_iter().map(Widget::new),
        ))
    }

    async fn drain(source: &mut RecordSource<Widget>) -> Vec<Vec<RecordId>> {
        let mut batches = vec![];
        while let Some(batch) = source.next_batch().await.unwrap() {
            batches.push(batch.ids());
        }
        batches
    }

    #[tokio::test]
    async fn test_range_batches_include_missing_ids() {
        let repo = repository([1, 2, 4, 5]);
        let mut source = RecordSource::new(
            SourceStrategy::Range { start: 1, end: 5 },
            repo,
            ListLookup::Filtered,
            2,
        );

        let first = source.next_batch().await.unwrap().unwrap();
        assert_eq!(first.ids(), vec![1, 2]);
        let second = source.next_batch().await.unwrap().unwrap();
        assert_eq!(second.ids(), vec![3, 4]);
        assert_eq!(second.missing(), vec![3]);
        let third = source.next_batch().await.unwrap().unwrap();
        assert_eq!(third.ids(), vec![5]);
        assert!(source.next_batch().await.unwrap().is_none());
        assert!(source.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inverted_range_is_empty() {
        let mut source = RecordSource::new(
            SourceStrategy::Range { start: 10, end: 1 },
            repository(1..=10),
            ListLookup::Filtered,
            5,
        );
        assert!(drain(&mut source).await.is_empty());
    }

    #[tokio::test]
    async fn test_range_reaching_max_id_terminates() {
        let mut source = RecordSource::new(
            SourceStrategy::Range {
                start: RecordId::MAX - 2,
                end: RecordId::MAX,
            },
            repository([]),
            ListLookup::Filtered,
            2,
        );
        assert_eq!(
            drain(&mut source).await,
            vec![
                vec![RecordId::MAX - 2, RecordId::MAX - 1],
                vec![RecordId::MAX]
            ]
        );
    }

    #[tokio::test]
    async fn test_list_keeps_given_order() {
        let repo = repository([1, 2, 3, 7]);
        let mut source = RecordSource::new(
            SourceStrategy::List(vec![7, 99, 1, 3]),
            repo.clone(),
            ListLookup::Filtered,
            3,
        );

        let first = source.next_batch().await.unwrap().unwrap();
        assert_eq!(first.ids(), vec![7, 99, 1]);
        assert_eq!(first.missing(), vec![99]);
        assert_eq!(
            first.records().map(|w| w.id).collect::<Vec<_>>(),
            vec![7, 1]
        );
        assert_eq!(drain(&mut source).await, vec![vec![3]]);
        assert_eq!(repo.filtered_queries(), 2);
        assert_eq!(repo.single_lookups(), 0);
    }

    #[tokio::test]
    async fn test_repeated_list_ids_resolve_the_same_in_both_lookups() {
        for lookup in [ListLookup::Filtered, ListLookup::PerId] {
            let mut source = RecordSource::new(
                SourceStrategy::List(vec![5, 5, 3, 5, 8]),
                repository([3, 5]),
                lookup,
                2,
            );

            let mut seen = vec![];
            let mut missing = vec![];
            while let Some(batch) = source.next_batch().await.unwrap() {
                seen.extend(batch.records().map(|w| w.id));
                missing.extend(batch.missing());
            }
            assert_eq!(seen, vec![5, 3], "{lookup:?}");
            assert_eq!(missing, vec![8], "{lookup:?}");
        }
    }

    #[tokio::test]
    async fn test_per_id_lookup() {
        let repo = repository([1, 2]);
        let mut source = RecordSource::new(
            SourceStrategy::List(vec![2, 5]),
            repo.clone(),
            ListLookup::PerId,
            10,
        );

        let batch = source.next_batch().await.unwrap().unwrap();
        assert_eq!(batch.missing(), vec![5]);
        assert_eq!(repo.single_lookups(), 2);
        assert_eq!(repo.filtered_queries(), 0);
    }

    #[tokio::test]
    async fn test_query_scan_pages_until_short_page() {
        let repo = repository([3, 5, 8, 13, 21]);
        let mut source = RecordSource::new(
            SourceStrategy::Query { start: 4 },
            repo.clone(),
            ListLookup::Filtered,
            2,
        );

        assert_eq!(
            drain(&mut source).await,
            vec![vec![5, 8], vec![13, 21]]
        );
        // The second page was full, so one more (empty) page was requested
        assert_eq!(repo.scans(), 3);
    }

    #[tokio::test]
    async fn test_query_scan_stops_on_short_page() {
        let repo = repository([1, 2, 3]);
        let mut source = RecordSource::new(
            SourceStrategy::Query { start: 1 },
            repo.clone(),
            ListLookup::Filtered,
            2,
        );

        assert_eq!(drain(&mut source).await, vec![vec![1, 2], vec![3]]);
        assert_eq!(repo.scans(), 2);
    }

    #[tokio::test]
    async fn test_repository_errors_propagate() {
        let repo = Arc::new(InMemoryRepository::<Widget>::new().failing("database offline"));
        let mut source = RecordSource::new(
            SourceStrategy::Range { start: 1, end: 3 },
            repo,
            ListLookup::Filtered,
            10,
        );

        let err = source.next_batch().await.err().unwrap();
        assert!(err.to_string().contains("database offline"));
    }
}
