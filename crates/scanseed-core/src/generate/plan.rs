use serde::Serialize;

use crate::generate::key_pool::KeyPool;
use crate::generate::populate::effective_row_count;
use crate::generate::value::{field_seed, ValueGenerator};
use crate::profile::{DatabaseProfile, FieldType, TableProfile};
use crate::schema::mapper::{table_definition, TypeMapper};

/// How a field's values will be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum GenerationStrategy {
    /// Truncated field with donor values; cycles through the pool.
    KeyCycle { pool_size: usize },
    /// Truncated field without donors; shape-only random strings.
    BlindRandom,
    /// Resampled from the profiled distribution.
    Weighted { distinct: usize, total_frequency: u64 },
}

/// A dry run of the generation: what every table and field would do.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationPlan {
    pub row_ceiling: usize,
    pub table_plans: Vec<TablePlan>,
}

/// Plan for a single table.
#[derive(Debug, Clone, Serialize)]
pub struct TablePlan {
    pub table_name: String,
    /// Rows that would be generated; 0 when the table cannot be generated.
    pub row_count: usize,
    pub field_plans: Vec<FieldPlan>,
    /// Why the table would fail, if it would.
    pub error: Option<String>,
}

/// Plan for a single field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldPlan {
    pub field_name: String,
    pub declared_type: FieldType,
    pub max_length: usize,
    /// Target column type from the mapper.
    pub column_type: String,
    pub strategy: GenerationStrategy,
}

impl GenerationPlan {
    /// Resolve strategies and row counts for every table without generating.
    pub fn build(
        profile: &DatabaseProfile,
        key_pool: &KeyPool,
        mapper: &dyn TypeMapper,
        row_ceiling: usize,
        seed: u64,
    ) -> Self {
        let table_plans = profile
            .tables
            .iter()
            .map(|table| TablePlan::build(table, key_pool, mapper, row_ceiling, seed))
            .collect();
        Self {
            row_ceiling,
            table_plans,
        }
    }

    /// Rows across every table that can be generated.
    pub fn total_rows(&self) -> usize {
        self.table_plans.iter().map(|t| t.row_count).sum()
    }

    pub fn table(&self, name: &str) -> Option<&TablePlan> {
        self.table_plans.iter().find(|t| t.table_name == name)
    }
}

impl TablePlan {
    fn build(
        table: &TableProfile,
        key_pool: &KeyPool,
        mapper: &dyn TypeMapper,
        row_ceiling: usize,
        seed: u64,
    ) -> Self {
        let failed = |message: String| Self {
            table_name: table.name.clone(),
            row_count: 0,
            field_plans: Vec::new(),
            error: Some(message),
        };

        // same order as the engine: type mapping first, then generators
        let definition = match table_definition(table, mapper) {
            Ok(definition) => definition,
            Err(e) => return failed(e.to_string()),
        };
        let mut generators = Vec::with_capacity(table.fields.len());
        for (index, field) in table.fields.iter().enumerate() {
            match ValueGenerator::for_field(&table.name, field, key_pool, field_seed(seed, &table.name, index)) {
                Ok(g) => generators.push(g),
                Err(e) => return failed(e.to_string()),
            }
        }

        let field_plans = table
            .fields
            .iter()
            .zip(&generators)
            .zip(definition.columns)
            .map(|((field, generator), column)| FieldPlan {
                field_name: field.name.clone(),
                declared_type: field.declared_type.clone(),
                max_length: field.max_length,
                column_type: column.sql_type,
                strategy: generator.strategy(),
            })
            .collect();

        Self {
            table_name: table.name.clone(),
            row_count: effective_row_count(row_ceiling, &generators),
            field_plans,
            error: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldPlan> {
        self.field_plans.iter().find(|f| f.field_name == name)
    }
}
