//! # onepass
//!
//! Resumable, idempotent batch processing. A job walks a range, a list or a
//! scan of records, applies a transformation to each one exactly once, and
//! remembers what it has done in an external checkpoint store so that an
//! interrupted run picks up where it stopped.
//!
//! ## Modules
//!
//! - `checkpoint` - Checked/failed id sets per job, plus a no-op store
//! - `engine` - Job builder, runner, options and run statistics
//! - `error` - Run-level error types
//! - `logging` - tracing subscriber setup
//! - `source` - Record repository trait and enumeration strategies
//! - `storage` - Named-set backends: Redis, files, memory
//! - `testing` - In-memory repository and output capture
pub mod checkpoint;
pub mod engine;
pub mod error;
pub mod logging;
pub mod source;
pub mod storage;

pub mod testing;

pub use checkpoint::{CheckpointStore, JobCheckpoints, NoopCheckpointStore, SetCheckpointStore};
pub use engine::{Job, MarkPolicy, OutputSink, RunOptions, RunStats, Runner};
pub use error::{RecordError, RunError};
pub use source::{Identified, RecordId, RecordRepository};
