//! In-memory sink, used by `scanseed preview` and by tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;

use super::BulkSink;
use crate::error::{Result, ScanSeedError};
use crate::generate::populate::Row;
use crate::schema::types::TableDef;

/// A table held by `MemorySink`.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    pub definition: TableDef,
    pub rows: Vec<Row>,
}

/// Keeps created tables and their rows in creation order.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<IndexMap<String, MemoryTable>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<MemoryTable> {
        self.lock().get(name).cloned()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn into_tables(self) -> IndexMap<String, MemoryTable> {
        self.tables.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, MemoryTable>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BulkSink for MemorySink {
    async fn create_table(&self, table: &TableDef) -> Result<()> {
        let mut tables = self.lock();
        if tables.contains_key(&table.name) {
            return Err(ScanSeedError::TableConflict {
                table: table.name.clone(),
                operation: "create_table".to_string(),
                message: "table already exists".to_string(),
            });
        }
        tables.insert(
            table.name.clone(),
            MemoryTable {
                definition: table.clone(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn insert_rows(&self, table: &TableDef, rows: &[Row]) -> Result<()> {
        let mut tables = self.lock();
        let target = tables
            .get_mut(&table.name)
            .ok_or_else(|| ScanSeedError::TableConflict {
                table: table.name.clone(),
                operation: "insert_rows".to_string(),
                message: "table does not exist".to_string(),
            })?;
        target.rows.extend_from_slice(rows);
        Ok(())
    }

    async fn drop_table(&self, table_name: &str) -> Result<()> {
        self.lock().shift_remove(table_name);
        Ok(())
    }
}
