//! Choosing how to enumerate the record space

use serde::{Deserialize, Serialize};

use super::repository::RecordId;
use crate::engine::RunOptions;

/// How list and range identifiers are resolved into records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListLookup {
    /// One `find_by_ids` query per batch
    #[default]
    Filtered,
    /// One `find_by_id` lookup per identifier
    PerId,
}

/// Enumeration strategy for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStrategy {
    /// Exactly these identifiers, in this order
    List(Vec<RecordId>),
    /// Every identifier in `[start, end]`, ascending
    Range { start: RecordId, end: RecordId },
    /// Batched scan of the record store from `start` until exhausted
    Query { start: RecordId },
}

impl SourceStrategy {
    /// Pick a strategy from the run options.
    ///
    /// A non-empty id list wins over a range, and a range wins over a scan.
    /// An end id without a start id ranges from 1. Returns `None` when no
    /// start id, end id or id list is set.
    pub fn select(options: &RunOptions) -> Option<Self> {
        if !options.id_list.is_empty() {
            return Some(Self::List(options.id_list.clone()));
        }
        match (options.start_id, options.end_id) {
            (start, Some(end)) => Some(Self::Range {
                start: start.unwrap_or(1),
                end,
            }),
            (Some(start), None) => Some(Self::Query { start }),
            (None, None) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Range { .. } => "range",
            Self::Query { .. } => "query",
        }
    }
}
