//! Run orchestration

use chrono::{Local, Utc};
use std::io;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use super::job::{BatchHook, Job, LifecycleHook, RecordHook};
use super::options::{MarkPolicy, RunOptions};
use super::output::OutputSink;
use super::stats::RunStats;
use crate::checkpoint::{CheckpointSet, CheckpointStore, JobNamespace};
use crate::error::{HookStage, RunError, RunResult};
use crate::source::{Batch, Identified, RecordId, RecordSource, SourceStrategy};

/// Executes a [`Job`] against a checkpoint store.
///
/// A runner performs exactly one run; [`Runner::run`] consumes it.
pub struct Runner<R> {
    job: Job<R>,
    store: Arc<dyn CheckpointStore>,
    output: OutputSink,
}

impl<R> Runner<R>
where
    R: Identified + Send + Sync + 'static,
{
    pub fn new(job: Job<R>, store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            job,
            store,
            output: OutputSink::stdout(),
        }
    }

    /// Send progress and summary lines somewhere other than stdout
    pub fn with_output(mut self, output: OutputSink) -> Self {
        self.output = output;
        self
    }

    /// Validate, then process every record the options select.
    ///
    /// Configuration problems are reported before any hook runs, any line is
    /// written or the store is touched. Per-record hook failures are counted
    /// in the returned stats; every other failure aborts the run.
    pub async fn run(self, options: RunOptions) -> RunResult<RunStats> {
        let execution = Execution::prepare(self.job, self.store, self.output, options)?;
        execution.execute().await
    }
}

struct Execution<R> {
    namespace: JobNamespace,
    checked_key: String,
    failed_key: String,
    strategy: &'static str,
    source: RecordSource<R>,
    before: Option<LifecycleHook>,
    before_batch: Option<BatchHook<R>>,
    per_record: RecordHook<R>,
    after_batch: Option<BatchHook<R>>,
    after: Option<LifecycleHook>,
    store: Arc<dyn CheckpointStore>,
    output: OutputSink,
    options: RunOptions,
    stats: RunStats,
}

impl<R> Execution<R>
where
    R: Identified + Send + Sync + 'static,
{
    fn prepare(
        job: Job<R>,
        store: Arc<dyn CheckpointStore>,
        output: OutputSink,
        options: RunOptions,
    ) -> RunResult<Self> {
        let strategy = SourceStrategy::select(&options).ok_or_else(|| {
            RunError::configuration("You must provide either a start id, an end id or an id list")
        })?;

        let Job {
            description,
            repository,
            lookup,
            before,
            before_batch,
            per_record,
            after_batch,
            after,
        } = job;

        let per_record =
            per_record.ok_or_else(|| RunError::configuration("No per-record hook defined"))?;
        let repository =
            repository.ok_or_else(|| RunError::configuration("No record repository configured"))?;
        if options.batch_size == 0 {
            return Err(RunError::configuration("Batch size must be at least 1"));
        }
        let namespace = JobNamespace::from_description(&description);
        if namespace.is_empty() {
            return Err(RunError::configuration("Job description must not be blank"));
        }

        let checked_key = store.key_for(&namespace, CheckpointSet::Checked);
        let failed_key = store.key_for(&namespace, CheckpointSet::Failed);
        let strategy_name = strategy.name();
        let source = RecordSource::new(strategy, repository, lookup, options.batch_size);

        Ok(Self {
            namespace,
            checked_key,
            failed_key,
            strategy: strategy_name,
            source,
            before,
            before_batch,
            per_record,
            after_batch,
            after,
            store,
            output,
            options,
            stats: RunStats::default(),
        })
    }

    async fn execute(mut self) -> RunResult<RunStats> {
        self.output
            .line(format!("Checked IDs being stored in: {}", self.checked_key))?;
        self.output
            .line(format!("Failed IDs being stored in: {}", self.failed_key))?;
        info!(
            job = %self.namespace,
            strategy = self.strategy,
            batch_size = self.options.batch_size,
            mark_policy = ?self.options.mark_policy,
            "Starting run"
        );

        if let Some(hook) = self.before.as_mut() {
            hook().map_err(|e| RunError::hook(HookStage::Before, e))?;
        }

        self.stats.started_at = Some(Utc::now());
        self.output.line(format!("Starting at {}...", timestamp()))?;

        while let Some(batch) = self
            .source
            .next_batch()
            .await
            .map_err(RunError::RecordSource)?
        {
            self.process_batch(&batch).await?;
        }

        self.store
            .expire(&self.namespace, self.options.checkpoint_ttl)
            .await?;

        self.output.line("done")?;
        self.stats.finished_at = Some(Utc::now());
        self.output.line(format!("Finished at {}...", timestamp()))?;
        self.output.line("")?;

        if let Some(hook) = self.after.as_mut() {
            hook().map_err(|e| RunError::hook(HookStage::After, e))?;
        }

        self.write_summary().await?;
        info!(
            job = %self.namespace,
            checked = self.stats.total_checked,
            succeeded = self.stats.success_count,
            skipped = self.stats.already_done,
            errors = self.stats.error_count(),
            "Run finished"
        );

        Ok(self.stats)
    }

    async fn process_batch(&mut self, batch: &Batch<R>) -> RunResult<()> {
        debug!(job = %self.namespace, size = batch.len(), "Processing batch");

        if let Some(hook) = self.before_batch.as_mut() {
            hook(batch).map_err(|e| RunError::hook(HookStage::BeforeBatch, e))?;
        }

        for slot in batch.slots() {
            match &slot.record {
                Some(record) => self.process_record(slot.id, record).await?,
                None => trace!(record_id = slot.id, "No record for id"),
            }
        }

        if let Some(hook) = self.after_batch.as_mut() {
            hook(batch).map_err(|e| RunError::hook(HookStage::AfterBatch, e))?;
        }
        Ok(())
    }

    async fn process_record(&mut self, id: RecordId, record: &R) -> RunResult<()> {
        if self.store.is_checked(&self.namespace, id).await? {
            trace!(record_id = id, "Already checked");
            self.stats.already_done += 1;
        } else {
            let policy = self.options.mark_policy;
            if policy == MarkPolicy::BeforeProcessing {
                self.store.mark_checked(&self.namespace, id).await?;
            }
            self.stats.total_checked += 1;

            let outcome = (self.per_record)(record);

            if policy == MarkPolicy::AfterProcessing {
                self.store.mark_checked(&self.namespace, id).await?;
            }

            match outcome {
                Ok(true) => self.stats.success_count += 1,
                Ok(false) => trace!(record_id = id, "Record left unchanged"),
                Err(err) => {
                    warn!(job = %self.namespace, record_id = id, error = %err, "Record failed");
                    self.output.line(format!("Error: Record {id}: {err}"))?;
                    self.stats.record_failure(id, err.message());
                    self.store.mark_failed(&self.namespace, id).await?;
                }
            }
        }

        self.report_progress()?;
        Ok(())
    }

    fn report_progress(&mut self) -> io::Result<()> {
        let interval = self.options.progress_interval;
        let considered = self.stats.considered();
        if interval == 0 || considered == 0 || considered % interval != 0 {
            return Ok(());
        }
        self.output.line(format!(
            "{}: Checked {} records, {} transformed.",
            timestamp(),
            self.stats.total_checked,
            self.stats.success_count
        ))
    }

    async fn write_summary(&mut self) -> RunResult<()> {
        self.output.line(format!(
            "Total records transformed: {} / {}",
            self.stats.success_count, self.stats.total_checked
        ))?;
        self.output.line(format!(
            "{} records previously checked and skipped",
            self.stats.already_done
        ))?;
        self.output
            .line(format!("{} errors", self.stats.error_count()))?;

        if self.stats.error_count() > 0 && !self.store.failed_ids(&self.namespace).await?.is_empty()
        {
            self.output.line(format!(
                "  Retrieve failed IDs from set: {}",
                self.failed_key
            ))?;
        }
        Ok(())
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S %z").to_string()
}
