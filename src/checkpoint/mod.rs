//! Checkpoint tracking for resumable runs
//!
//! Each job keeps two sets of record ids in an external store: the ids it
//! has started processing ("checked") and the ids whose processing failed
//! ("failed"). A rerun with the same job description skips every checked id.

pub mod inspector;
pub mod namespace;
pub mod store;

pub use inspector::{CheckpointSummary, JobCheckpoints};
pub use namespace::{checkpoint_key, CheckpointSet, JobNamespace, DEFAULT_KEY_PREFIX};
pub use store::{open_store, CheckpointStore, NoopCheckpointStore, SetCheckpointStore};
