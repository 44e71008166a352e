//! # Bulk Sinks
//!
//! Where generated tables end up. The engine only needs three operations per
//! table: create it, write all its rows in one call, and drop it again if the
//! table's unit of work has to be abandoned.

pub mod direct;
pub mod memory;
pub mod retry;

use std::future::Future;

use crate::error::Result;
use crate::generate::populate::Row;
use crate::schema::types::TableDef;

/// A bulk-write target.
pub trait BulkSink: Send + Sync {
    /// Create an empty table with the given columns, in order.
    fn create_table(&self, table: &TableDef) -> impl Future<Output = Result<()>> + Send;

    /// Write all rows of a table. Either every row lands or none do.
    fn insert_rows(&self, table: &TableDef, rows: &[Row]) -> impl Future<Output = Result<()>> + Send;

    /// Remove a table created earlier in the same run.
    fn drop_table(&self, table_name: &str) -> impl Future<Output = Result<()>> + Send;
}
