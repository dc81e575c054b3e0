//! Run statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::source::RecordId;

/// A record whose per-record hook failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub id: RecordId,
    pub message: String,
}

impl fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record {}: {}", self.id, self.message)
    }
}

/// Counters for one run.
///
/// Records with no backing data never touch these counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Records newly marked checked by this run
    pub total_checked: u64,
    /// Records whose hook reported success
    pub success_count: u64,
    /// Records skipped because an earlier run already checked them
    pub already_done: u64,
    pub errors: Vec<RecordFailure>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunStats {
    /// Records considered: newly checked plus skipped
    pub fn considered(&self) -> u64 {
        self.total_checked + self.already_done
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn failed_ids(&self) -> Vec<RecordId> {
        self.errors.iter().map(|failure| failure.id).collect()
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }

    pub(crate) fn record_failure(&mut self, id: RecordId, message: impl Into<String>) {
        self.errors.push(RecordFailure {
            id,
            message: message.into(),
        });
    }
}
