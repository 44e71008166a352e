use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Table as ComfyTable};

use scanseed_core::config::read_config;
use scanseed_core::generate::key_pool::KeyPool;
use scanseed_core::generate::plan::{GenerationPlan, GenerationStrategy};
use scanseed_core::DatabaseType;

use super::{read_profile, resolve_options, OptionOverrides};
use crate::args::{InspectArgs, InspectFormat};

pub fn run(args: &InspectArgs) -> Result<()> {
    let config = read_config(Path::new("."))?;
    let profile = read_profile(&args.profile, config.as_ref())?;
    let options = resolve_options(
        config.as_ref(),
        &OptionOverrides {
            rows: args.rows,
            qualified_keys: args.qualified_keys,
            ..OptionOverrides::default()
        },
    );
    options.validate()?;

    let dialect = DatabaseType::from(args.dialect);
    let key_pool = KeyPool::build(&profile, &options.key_matching);
    let plan = GenerationPlan::build(&profile, &key_pool, &dialect, options.row_ceiling, options.seed);

    match args.format {
        InspectFormat::Json => {
            let json = serde_json::to_string_pretty(&plan)?;
            println!("{}", json);
        }
        InspectFormat::Table => {
            println!("Dialect: {}", dialect);
            println!(
                "Profile: {} tables, {} fields  Row ceiling: {}  Key pool: {} keys, {} values",
                profile.table_count(),
                profile.field_count(),
                plan.row_ceiling,
                key_pool.keys().count(),
                key_pool.value_count()
            );
            println!("Rows to generate: {}\n", plan.total_rows());

            for table_plan in &plan.table_plans {
                if let Some(error) = &table_plan.error {
                    println!("━━━ {} ✗ ━━━", table_plan.table_name);
                    println!("{}\n", error);
                    continue;
                }
                println!("━━━ {} ({} rows) ━━━", table_plan.table_name, table_plan.row_count);

                let mut t = ComfyTable::new();
                t.set_header(vec!["Field", "Type", "Length", "Column", "Strategy"]);
                for field in &table_plan.field_plans {
                    t.add_row(vec![
                        Cell::new(&field.field_name),
                        Cell::new(field.declared_type.to_string()),
                        Cell::new(field.max_length),
                        Cell::new(&field.column_type),
                        Cell::new(describe_strategy(&field.strategy)),
                    ]);
                }
                println!("{}\n", t);
            }
        }
    }

    Ok(())
}

fn describe_strategy(strategy: &GenerationStrategy) -> String {
    match strategy {
        GenerationStrategy::KeyCycle { pool_size } => format!("key cycle ({} values)", pool_size),
        GenerationStrategy::BlindRandom => "blind random".to_string(),
        GenerationStrategy::Weighted {
            distinct,
            total_frequency,
        } => format!("weighted ({} values, n={})", distinct, total_frequency),
    }
}
