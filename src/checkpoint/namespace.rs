//! Job namespaces and checkpoint key layout

use serde::{Deserialize, Serialize};
use std::fmt;

/// Leading component of every checkpoint key unless configured otherwise
pub const DEFAULT_KEY_PREFIX: &str = "one_timer_script";

/// Normalized form of a job description.
///
/// Lower-cased, with whitespace runs collapsed into `_`. Descriptions that
/// normalize to the same namespace share checkpoint state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobNamespace(String);

impl JobNamespace {
    pub fn from_description(description: &str) -> Self {
        let normalized = description
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the description had no non-whitespace characters
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for JobNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two sets kept per job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointSet {
    /// Every id the engine has started processing
    Checked,
    /// Ids whose per-record hook failed; always a subset of `Checked`
    Failed,
}

impl CheckpointSet {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Checked => "checked",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CheckpointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// `<prefix>:<namespace>:<checked|failed>`
pub fn checkpoint_key(prefix: &str, namespace: &JobNamespace, set: CheckpointSet) -> String {
    format!("{prefix}:{namespace}:{}", set.suffix())
}
