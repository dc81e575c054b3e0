//! Record enumeration
//!
//! A run walks its records through one of three strategies: an explicit id
//! list, a closed id range, or a batched scan of the record store. Every
//! strategy yields [`Batch`]es of the configured size.

pub mod batch;
pub mod record_source;
pub mod repository;
pub mod strategy;

pub use batch::{Batch, RecordSlot};
pub use record_source::RecordSource;
pub use repository::{Identified, RecordId, RecordRepository};
pub use strategy::{ListLookup, SourceStrategy};
