use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{bail, Result};
use comfy_table::{Cell, Table as ComfyTable};
use indicatif::{ProgressBar, ProgressStyle};

use scanseed_core::config::{read_config, ScanSeedConfig};
use scanseed_core::generate::engine::{self, CancelFlag, GenerationReport, ProgressFn, TableStatus};
use scanseed_core::generate::key_pool::KeyPool;
use scanseed_core::generate::plan::GenerationPlan;
use scanseed_core::output::direct::SqlxSink;
use scanseed_core::schema::database_type_from_url;
use scanseed_core::ScanSeedError;

use super::{read_profile, resolve_options, OptionOverrides};
use crate::args::GenerateArgs;

pub async fn run(args: &GenerateArgs) -> Result<()> {
    // Load optional scanseed.toml config
    let config = read_config(Path::new("."))?;
    let profile = read_profile(&args.profile, config.as_ref())?;
    let options = resolve_options(
        config.as_ref(),
        &OptionOverrides {
            rows: args.rows,
            seed: args.seed,
            concurrency: args.concurrency,
            qualified_keys: args.qualified_keys,
        },
    );

    let db_url = resolve_db_url(args.db.as_deref(), config.as_ref())?;
    let db_type = database_type_from_url(&db_url)?;
    tracing::debug!(
        rows = options.row_ceiling,
        seed = options.seed,
        concurrency = options.concurrency,
        "resolved generation options"
    );

    // Phase 1: Connect
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} [{prefix}] {msg}")?);
    pb.set_prefix("1/2");
    pb.set_message(format!("Connecting to {}...", db_type));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let pool_size = u32::try_from(options.concurrency).unwrap_or(u32::MAX);
    let sink = Arc::new(SqlxSink::connect(&db_url, pool_size).await?);
    pb.finish_with_message(format!(
        "Connecting to {}... ✓ {} tables, {} fields in profile",
        db_type,
        profile.table_count(),
        profile.field_count()
    ));

    // Phase 2: Generate and write
    let key_pool = KeyPool::build(&profile, &options.key_matching);
    let plan = GenerationPlan::build(&profile, &key_pool, &db_type, options.row_ceiling, options.seed);
    let total_rows = plan.total_rows();

    let pb2 = ProgressBar::new(total_rows as u64);
    pb2.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [2/2] Generating tables... {bar:40.cyan/dim} {pos}/{len} ({eta})")?
            .progress_chars("█▓░"),
    );

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted: finishing tables already written, skipping the rest...");
            on_interrupt.cancel();
        }
    });

    let report = engine::run(
        &profile,
        Arc::new(db_type),
        sink,
        &options,
        &cancel,
        Some(progress_callback(pb2.clone())),
    )
    .await?;

    pb2.finish_with_message(format!("Generating tables... ✓ ({} rows)", report.total_rows()));

    print_report(&report);

    let failed = report.failures().count();
    if failed > 0 {
        bail!("{} of {} tables failed", failed, report.outcomes.len());
    }
    if report.cancelled_count() > 0 {
        bail!(
            "Run cancelled: {} tables written, {} skipped",
            report.committed_count(),
            report.cancelled_count()
        );
    }

    eprintln!(
        "\n✓ Inserted {} rows across {} tables into {}",
        report.total_rows(),
        report.committed_count(),
        db_type,
    );
    Ok(())
}

/// Advance one overall bar from per-table cumulative counts.
fn progress_callback(bar: ProgressBar) -> ProgressFn {
    let seen: Mutex<HashMap<String, usize>> = Mutex::new(HashMap::new());
    Arc::new(move |table: &str, produced: usize, _total: usize| {
        let mut seen = seen.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = seen.insert(table.to_string(), produced).unwrap_or(0);
        bar.inc(produced.saturating_sub(previous) as u64);
    })
}

fn print_report(report: &GenerationReport) {
    let mut t = ComfyTable::new();
    t.set_header(vec!["Table", "Status", "Rows", "Detail"]);
    for outcome in &report.outcomes {
        let (status, rows, detail) = match &outcome.status {
            TableStatus::Committed { rows } => ("✓ committed", rows.to_string(), String::new()),
            TableStatus::Failed { error } => ("✗ failed", "0".to_string(), error.to_string()),
            TableStatus::Cancelled => ("- cancelled", "0".to_string(), String::new()),
        };
        t.add_row(vec![
            Cell::new(&outcome.table_name),
            Cell::new(status),
            Cell::new(rows),
            Cell::new(detail),
        ]);
    }
    eprintln!("\n{}", t);
}

/// Resolve database URL from args, env, .env file, or scanseed.toml.
fn resolve_db_url(explicit: Option<&str>, config: Option<&ScanSeedConfig>) -> Result<String> {
    if let Some(url) = explicit {
        return Ok(url.to_string());
    }

    // Try environment variable
    if let Ok(url) = std::env::var("DATABASE_URL") {
        return Ok(url);
    }

    // Try .env file
    if dotenvy::dotenv().is_ok() {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            return Ok(url);
        }
    }

    // Try scanseed.toml
    if let Some(url) = config.and_then(|c| c.database.url.clone()) {
        return Ok(url);
    }

    Err(ScanSeedError::NoDatabaseUrl.into())
}
