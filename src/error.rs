use std::fmt;
use thiserror::Error;

use crate::storage::StorageError;

/// Result type for a whole run
pub type RunResult<T> = Result<T, RunError>;

/// Lifecycle hook positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Before,
    BeforeBatch,
    AfterBatch,
    After,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Before => "before",
            Self::BeforeBatch => "before-batch",
            Self::AfterBatch => "after-batch",
            Self::After => "after",
        };
        f.write_str(name)
    }
}

/// Errors that abort a run.
///
/// Per-record failures are not represented here; they are recovered by the
/// engine and reported through [`crate::engine::RunStats`].
#[derive(Error, Debug)]
pub enum RunError {
    /// The job or its options are incomplete. Raised before any side effect.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Checkpoint store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),

    #[error("The {stage} hook failed: {source}")]
    LifecycleHook {
        stage: HookStage,
        #[source]
        source: anyhow::Error,
    },

    #[error("Record source failed: {0}")]
    RecordSource(#[source] anyhow::Error),

    #[error("Failed to write run output: {0}")]
    Output(#[from] std::io::Error),
}

impl RunError {
    /// Create a configuration error
    pub fn configuration<M: fmt::Display>(msg: M) -> Self {
        Self::Configuration(msg.to_string())
    }

    pub(crate) fn hook(stage: HookStage, source: anyhow::Error) -> Self {
        Self::LifecycleHook { stage, source }
    }

    /// True for errors raised by validation, before anything ran
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Failure raised by a per-record hook.
///
/// This is the only failure the engine recovers from: the record is marked
/// failed, the message is kept in the run statistics, and the run continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RecordError {
    message: String,
}

impl RecordError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for RecordError {
    fn from(err: anyhow::Error) -> Self {
        // Alternate formatting keeps the context chain on one line
        Self::new(format!("{err:#}"))
    }
}

impl From<String> for RecordError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for RecordError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
