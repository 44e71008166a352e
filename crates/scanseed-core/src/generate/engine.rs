//! # Generation Engine
//!
//! Drives a whole run: build the key pool once, then populate every table of
//! the profile and hand it to a [`BulkSink`].
//!
//! Tables only depend on the key pool, never on each other's rows, so each
//! table runs as its own tokio task. A semaphore bounds how many are in
//! flight. Every sink call goes through the configured [`RetryPolicy`].
//!
//! A table is one unit of work. Once its `create_table` has succeeded, any
//! later failure or a cancellation drops the table again, so the target never
//! keeps a half-written table. A sink call that timed out may still have
//! taken effect, so a failed create after a timeout drops the table too, and
//! an insert retried after a timeout starts again from an empty table.
//! Failures are reported per table; the run as a whole only fails on invalid
//! options.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{Result, ScanSeedError};
use crate::generate::key_pool::{KeyMatching, KeyPool};
use crate::generate::populate::TablePopulator;
use crate::output::retry::{AttemptTracker, RetryPolicy};
use crate::output::BulkSink;
use crate::profile::DatabaseProfile;
use crate::schema::mapper::{table_definition, TypeMapper};
use crate::schema::types::TableDef;

/// Called with (table, rows generated so far, table row count) after each batch.
pub type ProgressFn = Arc<dyn Fn(&str, usize, usize) + Send + Sync>;

/// Tunables for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Target row ceiling per table.
    pub row_ceiling: usize,
    pub seed: u64,
    /// Tables generated and written at the same time.
    pub concurrency: usize,
    /// Rows generated between cancellation checks.
    pub batch_size: usize,
    pub key_matching: KeyMatching,
    pub retry: RetryPolicy,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            row_ceiling: 1000,
            seed: 42,
            concurrency: 4,
            batch_size: 1000,
            key_matching: KeyMatching::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl GenerationOptions {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("row ceiling", self.row_ceiling),
            ("concurrency", self.concurrency),
            ("batch size", self.batch_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ScanSeedError::Config {
                    message: format!("{} must be greater than 0", name),
                });
            }
        }
        if self.retry.timeout.is_zero() {
            return Err(ScanSeedError::Config {
                message: "retry timeout must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Shared cancellation signal.
///
/// Checked before a table starts and between row batches. Tables that have
/// already been written are left alone.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub enum TableStatus {
    Committed { rows: usize },
    Failed { error: ScanSeedError },
    Cancelled,
}

#[derive(Debug)]
pub struct TableOutcome {
    pub table_name: String,
    pub status: TableStatus,
}

/// One outcome per profile table, in profile order.
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub outcomes: Vec<TableOutcome>,
}

impl GenerationReport {
    pub fn outcome(&self, table_name: &str) -> Option<&TableOutcome> {
        self.outcomes.iter().find(|o| o.table_name == table_name)
    }

    pub fn committed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, TableStatus::Committed { .. }))
            .count()
    }

    pub fn cancelled_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, TableStatus::Cancelled))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ScanSeedError)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            TableStatus::Failed { error } => Some((o.table_name.as_str(), error)),
            _ => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Rows across every committed table.
    pub fn total_rows(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                TableStatus::Committed { rows } => rows,
                _ => 0,
            })
            .sum()
    }
}

/// Everything a table task needs, owned so it can move into a spawned task.
struct TableContext<S> {
    profile: Arc<DatabaseProfile>,
    key_pool: Arc<KeyPool>,
    mapper: Arc<dyn TypeMapper>,
    sink: Arc<S>,
    options: GenerationOptions,
    cancel: CancelFlag,
    progress: Option<ProgressFn>,
}

impl<S> Clone for TableContext<S> {
    fn clone(&self) -> Self {
        Self {
            profile: Arc::clone(&self.profile),
            key_pool: Arc::clone(&self.key_pool),
            mapper: Arc::clone(&self.mapper),
            sink: Arc::clone(&self.sink),
            options: self.options.clone(),
            cancel: self.cancel.clone(),
            progress: self.progress.clone(),
        }
    }
}

/// Generate every table of `profile` into `sink`.
///
/// Returns `Err` only when `options` are invalid. Per-table problems
/// (profile errors, unmapped types, sink failures, cancellation) are
/// reported in the [`GenerationReport`].
pub async fn run<S: BulkSink + 'static>(
    profile: &DatabaseProfile,
    mapper: Arc<dyn TypeMapper>,
    sink: Arc<S>,
    options: &GenerationOptions,
    cancel: &CancelFlag,
    progress: Option<ProgressFn>,
) -> Result<GenerationReport> {
    options.validate()?;

    let key_pool = KeyPool::build(profile, &options.key_matching);
    let ctx = TableContext {
        profile: Arc::new(profile.clone()),
        key_pool: Arc::new(key_pool),
        mapper,
        sink,
        options: options.clone(),
        cancel: cancel.clone(),
        progress,
    };

    info!(
        "Generating {} tables (ceiling {} rows, concurrency {})",
        profile.table_count(),
        options.row_ceiling,
        options.concurrency
    );

    let semaphore = Arc::new(Semaphore::new(options.concurrency));
    let mut tasks = JoinSet::new();
    for index in 0..profile.tables.len() {
        let ctx = ctx.clone();
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let status = match semaphore.acquire_owned().await {
                Ok(_permit) => run_table(&ctx, index).await,
                Err(_) => TableStatus::Failed {
                    error: ScanSeedError::Other("worker pool closed".to_string()),
                },
            };
            (index, status)
        });
    }

    let mut slots: Vec<Option<TableStatus>> = profile.tables.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, status)) => slots[index] = Some(status),
            Err(e) => warn!("Table task did not complete: {}", e),
        }
    }

    let outcomes = profile
        .tables
        .iter()
        .zip(slots)
        .map(|(table, slot)| TableOutcome {
            table_name: table.name.clone(),
            status: slot.unwrap_or_else(|| TableStatus::Failed {
                error: ScanSeedError::Other(format!("generation task for {} panicked", table.name)),
            }),
        })
        .collect();

    Ok(GenerationReport { outcomes })
}

async fn run_table<S: BulkSink>(ctx: &TableContext<S>, index: usize) -> TableStatus {
    let table = &ctx.profile.tables[index];
    if ctx.cancel.is_cancelled() {
        debug!("Skipping {}: run cancelled", table.name);
        return TableStatus::Cancelled;
    }

    let definition = match table_definition(table, ctx.mapper.as_ref()) {
        Ok(definition) => definition,
        Err(error) => {
            warn!("Skipping {}: {}", table.name, error);
            return TableStatus::Failed { error };
        }
    };
    let populator = match TablePopulator::new(table, &ctx.key_pool, ctx.options.row_ceiling, ctx.options.seed) {
        Ok(populator) => populator,
        Err(error) => {
            warn!("Skipping {}: {}", table.name, error);
            return TableStatus::Failed { error };
        }
    };

    let sink = ctx.sink.as_ref();
    let tracker = AttemptTracker::default();
    let create = {
        let (tracker, definition) = (&tracker, &definition);
        ctx.options
            .retry
            .run(&table.name, "create_table", || async move {
                tracker.begin();
                let result = sink.create_table(definition).await;
                tracker.finish();
                result
            })
            .await
    };
    if let Err(error) = create {
        warn!("Could not create {}: {}", table.name, error);
        // a timed-out attempt may have created the table after all
        if tracker.any_abandoned() {
            rollback(ctx, &table.name).await;
        }
        return TableStatus::Failed { error };
    }

    info!("Generating {} rows for {}", populator.row_count(), table.name);
    match fill_table(ctx, &definition, populator).await {
        Ok(rows) => {
            info!("Committed {} rows to {}", rows, table.name);
            TableStatus::Committed { rows }
        }
        Err(error) => {
            rollback(ctx, &table.name).await;
            match error {
                ScanSeedError::Cancelled { .. } => TableStatus::Cancelled,
                error => {
                    warn!("Generation of {} failed: {}", table.name, error);
                    TableStatus::Failed { error }
                }
            }
        }
    }
}

/// Generate all rows in batches, then write them with one sink call.
async fn fill_table<S: BulkSink>(
    ctx: &TableContext<S>,
    definition: &TableDef,
    mut populator: TablePopulator<'_>,
) -> Result<usize> {
    let table_name = definition.name.as_str();
    let cancelled = || ScanSeedError::Cancelled {
        table: table_name.to_string(),
    };

    let mut rows = Vec::with_capacity(populator.row_count());
    while !populator.is_finished() {
        if ctx.cancel.is_cancelled() {
            return Err(cancelled());
        }
        rows.extend(populator.next_batch(ctx.options.batch_size));
        if let Some(progress) = &ctx.progress {
            progress(table_name, populator.produced(), populator.row_count());
        }
        tokio::task::yield_now().await;
    }
    if ctx.cancel.is_cancelled() {
        return Err(cancelled());
    }

    let sink = ctx.sink.as_ref();
    let batch = rows.as_slice();
    let tracker = &AttemptTracker::default();
    ctx.options
        .retry
        .run(table_name, "insert_rows", || async move {
            // A timed-out attempt may have committed; start over from an
            // empty table so no row lands twice.
            let reset = tracker.begin();
            let ready = if reset { recreate(sink, definition).await } else { Ok(()) };
            let result = match ready {
                Ok(()) => sink.insert_rows(definition, batch).await,
                Err(e) => Err(e),
            };
            tracker.finish();
            result
        })
        .await?;
    Ok(rows.len())
}

async fn recreate<S: BulkSink>(sink: &S, definition: &TableDef) -> Result<()> {
    sink.drop_table(&definition.name).await?;
    sink.create_table(definition).await
}

async fn rollback<S: BulkSink>(ctx: &TableContext<S>, table_name: &str) {
    let sink = ctx.sink.as_ref();
    let dropped = ctx
        .options
        .retry
        .run(table_name, "drop_table", || sink.drop_table(table_name))
        .await;
    match dropped {
        Ok(()) => warn!("Dropped partially generated table {}", table_name),
        Err(e) => warn!("Could not drop {} after failure: {}", table_name, e),
    }
}
