//! Per-run options

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::RunError;
use crate::source::RecordId;

const DEFAULT_BATCH_SIZE: usize = 1000;
const DEFAULT_PROGRESS_INTERVAL: u64 = 10_000;
const DEFAULT_CHECKPOINT_TTL: Duration = Duration::from_secs(90 * 24 * 60 * 60);

/// When a record is added to the checked set relative to its hook
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkPolicy {
    /// Mark first, then run the hook. A crash inside the hook leaves the id
    /// checked, so it is never retried (at most once).
    #[default]
    BeforeProcessing,
    /// Run the hook, then mark. A crash inside the hook leaves the id
    /// unchecked, so the next run retries it (at least once).
    AfterProcessing,
}

/// Options for a single run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub start_id: Option<RecordId>,
    pub end_id: Option<RecordId>,
    /// Explicit ids; when non-empty, start and end are ignored
    pub id_list: Vec<RecordId>,
    pub batch_size: usize,
    /// Time-to-live applied to the checkpoint sets after the run. Zero keeps
    /// them forever.
    #[serde(with = "humantime_serde")]
    pub checkpoint_ttl: Duration,
    /// Emit a progress line every this many considered records. Zero disables.
    pub progress_interval: u64,
    pub mark_policy: MarkPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            start_id: None,
            end_id: None,
            id_list: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            checkpoint_ttl: DEFAULT_CHECKPOINT_TTL,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            mark_policy: MarkPolicy::default(),
        }
    }
}

impl RunOptions {
    /// Closed range `[start, end]`
    pub fn range(start: RecordId, end: RecordId) -> Self {
        Self {
            start_id: Some(start),
            end_id: Some(end),
            ..Self::default()
        }
    }

    /// Scan the record store from `start` until exhausted
    pub fn from_start(start: RecordId) -> Self {
        Self {
            start_id: Some(start),
            ..Self::default()
        }
    }

    /// Exactly these ids, in order
    pub fn ids(ids: impl IntoIterator<Item = RecordId>) -> Self {
        Self {
            id_list: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_checkpoint_ttl(mut self, ttl: Duration) -> Self {
        self.checkpoint_ttl = ttl;
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_mark_policy(mut self, policy: MarkPolicy) -> Self {
        self.mark_policy = policy;
        self
    }

    /// Read options from the process environment
    pub fn from_env() -> Result<Self, RunError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read options from a variable lookup.
    ///
    /// `START`, `END`, `ID_LIST` (comma-delimited), `BATCH_SIZE` and
    /// `CHECKPOINT_EXPIRATION` (seconds, `<= 0` disables expiry;
    /// `REDIS_EXPIRATION` is accepted as an alias). Blank values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RunError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut options = Self::default();

        if let Some(value) = get("START") {
            options.start_id = Some(parse_number("START", &value)?);
        }
        if let Some(value) = get("END") {
            options.end_id = Some(parse_number("END", &value)?);
        }
        if let Some(value) = get("ID_LIST") {
            options.id_list = value
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| parse_number("ID_LIST", id))
                .collect::<Result<_, _>>()?;
        }
        if let Some(value) = get("BATCH_SIZE") {
            options.batch_size = parse_number("BATCH_SIZE", &value)?;
        }
        if let Some(value) = get("CHECKPOINT_EXPIRATION").or_else(|| get("REDIS_EXPIRATION")) {
            let seconds: i64 = parse_number("CHECKPOINT_EXPIRATION", &value)?;
            options.checkpoint_ttl = Duration::from_secs(u64::try_from(seconds).unwrap_or(0));
        }

        Ok(options)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, RunError> {
    value
        .trim()
        .parse()
        .map_err(|_| RunError::configuration(format!("{name} must be an integer, got {value:?}")))
}
