use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use comfy_table::Table as ComfyTable;

use scanseed_core::config::read_config;
use scanseed_core::generate::engine::{self, CancelFlag, TableStatus};
use scanseed_core::output::memory::MemorySink;
use scanseed_core::DatabaseType;

use super::{display_value, read_profile, resolve_options, OptionOverrides};
use crate::args::PreviewArgs;

/// Longest value shown in a preview cell.
const MAX_CELL_CHARS: usize = 40;

pub async fn run(args: &PreviewArgs) -> Result<()> {
    let config = read_config(Path::new("."))?;
    let profile = read_profile(&args.profile, config.as_ref())?;
    let options = resolve_options(
        config.as_ref(),
        &OptionOverrides {
            rows: Some(args.rows),
            seed: args.seed,
            qualified_keys: args.qualified_keys,
            ..OptionOverrides::default()
        },
    );

    let sink = Arc::new(MemorySink::new());
    let report = engine::run(
        &profile,
        Arc::new(DatabaseType::from(args.dialect)),
        Arc::clone(&sink),
        &options,
        &CancelFlag::new(),
        None,
    )
    .await?;

    for outcome in &report.outcomes {
        if let TableStatus::Failed { error } = &outcome.status {
            println!("━━━ {} ✗ ━━━", outcome.table_name);
            println!("{}\n", error);
            continue;
        }
        let Some(table) = sink.table(&outcome.table_name) else {
            continue;
        };

        println!("━━━ {} ({} rows) ━━━", outcome.table_name, table.rows.len());

        let mut t = ComfyTable::new();
        t.set_header(
            table
                .definition
                .columns
                .iter()
                .map(|c| format!("{}\n{}", c.name, c.sql_type))
                .collect::<Vec<_>>(),
        );
        for row in &table.rows {
            let values: Vec<String> = table
                .definition
                .column_names()
                .map(|col| {
                    row.get(col)
                        .map(|v| display_value(v, MAX_CELL_CHARS))
                        .unwrap_or_default()
                })
                .collect();
            t.add_row(values);
        }

        println!("{}\n", t);
    }

    Ok(())
}
