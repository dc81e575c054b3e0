//! Job definition: description, record source and hooks

use std::fmt;
use std::sync::Arc;

use crate::checkpoint::JobNamespace;
use crate::error::RecordError;
use crate::source::{Batch, ListLookup, RecordRepository};

/// Hook run once before or after the whole pass
pub type LifecycleHook = Box<dyn FnMut() -> anyhow::Result<()> + Send>;

/// Hook run around every batch
pub type BatchHook<R> = Box<dyn FnMut(&Batch<R>) -> anyhow::Result<()> + Send>;

/// Transformation applied to each unchecked record.
///
/// `Ok(true)` counts as a success, `Ok(false)` as a record that needed no
/// change, and `Err` marks the record failed without stopping the run.
pub type RecordHook<R> = Box<dyn FnMut(&R) -> Result<bool, RecordError> + Send>;

/// A one-off pass over a set of records.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use onepass::engine::Job;
/// # use onepass::testing::{InMemoryRepository, Widget};
/// let widgets = Arc::new(InMemoryRepository::from_records((1..=3).map(Widget::new)));
/// let job = Job::<Widget>::new("Rename widgets")
///     .repository(widgets)
///     .per_record(|widget: &Widget| Ok(!widget.name.is_empty()));
/// ```
pub struct Job<R> {
    pub(crate) description: String,
    pub(crate) repository: Option<Arc<dyn RecordRepository<Record = R>>>,
    pub(crate) lookup: ListLookup,
    pub(crate) before: Option<LifecycleHook>,
    pub(crate) before_batch: Option<BatchHook<R>>,
    pub(crate) per_record: Option<RecordHook<R>>,
    pub(crate) after_batch: Option<BatchHook<R>>,
    pub(crate) after: Option<LifecycleHook>,
}

impl<R> Job<R> {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            repository: None,
            lookup: ListLookup::default(),
            before: None,
            before_batch: None,
            per_record: None,
            after_batch: None,
            after: None,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn namespace(&self) -> JobNamespace {
        JobNamespace::from_description(&self.description)
    }

    /// Where records come from. Required.
    pub fn repository(mut self, repository: Arc<dyn RecordRepository<Record = R>>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// How list and range ids are looked up
    pub fn lookup(mut self, lookup: ListLookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        self.before = Some(Box::new(hook));
        self
    }

    pub fn before_batch<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&Batch<R>) -> anyhow::Result<()> + Send + 'static,
    {
        self.before_batch = Some(Box::new(hook));
        self
    }

    /// The transformation itself. Required.
    pub fn per_record<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&R) -> Result<bool, RecordError> + Send + 'static,
    {
        self.per_record = Some(Box::new(hook));
        self
    }

    pub fn after_batch<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&Batch<R>) -> anyhow::Result<()> + Send + 'static,
    {
        self.after_batch = Some(Box::new(hook));
        self
    }

    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        self.after = Some(Box::new(hook));
        self
    }
}

impl<R> fmt::Debug for Job<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("description", &self.description)
            .field("has_repository", &self.repository.is_some())
            .field("lookup", &self.lookup)
            .field("has_before", &self.before.is_some())
            .field("has_before_batch", &self.before_batch.is_some())
            .field("has_per_record", &self.per_record.is_some())
            .field("has_after_batch", &self.after_batch.is_some())
            .field("has_after", &self.after.is_some())
            .finish()
    }
}
