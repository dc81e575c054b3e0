//! Batches handed to the engine and to batch hooks

use super::repository::RecordId;

/// One identifier and the record it resolved to, if any
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSlot<R> {
    pub id: RecordId,
    pub record: Option<R>,
}

impl<R> RecordSlot<R> {
    pub fn found(id: RecordId, record: R) -> Self {
        Self {
            id,
            record: Some(record),
        }
    }

    pub fn missing(id: RecordId) -> Self {
        Self { id, record: None }
    }
}

/// A consecutive group of slots, in source order.
///
/// Missing records stay in the batch as empty slots so that id-based
/// iteration keeps its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<R> {
    slots: Vec<RecordSlot<R>>,
}

impl<R> Batch<R> {
    pub fn new(slots: Vec<RecordSlot<R>>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[RecordSlot<R>] {
        &self.slots
    }

    /// Every identifier in the batch, including missing ones
    pub fn ids(&self) -> Vec<RecordId> {
        self.slots.iter().map(|slot| slot.id).collect()
    }

    /// Records that resolved, in order
    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.slots.iter().filter_map(|slot| slot.record.as_ref())
    }

    /// Identifiers with no record behind them
    pub fn missing(&self) -> Vec<RecordId> {
        self.slots
            .iter()
            .filter(|slot| slot.record.is_none())
            .map(|slot| slot.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_views() {
        let batch = Batch::new(vec![
            RecordSlot::found(1, "a"),
            RecordSlot::missing(2),
            RecordSlot::found(3, "c"),
        ]);

        assert_eq!(batch.len(), 3);
        assert!(!batch.is_empty());
        assert_eq!(batch.ids(), vec![1, 2, 3]);
        assert_eq!(batch.records().copied().collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(batch.missing(), vec![2]);
    }
}
