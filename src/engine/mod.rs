//! Execution engine
//!
//! A [`Job`] names the work and carries its hooks; a [`Runner`] drives it over
//! the records selected by [`RunOptions`], consulting the checkpoint store for
//! every record, and returns the [`RunStats`].

pub mod job;
pub mod options;
pub mod output;
pub mod runner;
pub mod stats;

pub use job::{BatchHook, Job, LifecycleHook, RecordHook};
pub use options::{MarkPolicy, RunOptions};
pub use output::OutputSink;
pub use runner::Runner;
pub use stats::{RecordFailure, RunStats};
