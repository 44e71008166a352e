use serde::{Deserialize, Serialize};
use std::fmt;

use crate::profile::FieldType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseType {
    PostgreSQL,
    MySQL,
    SQLite,
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::PostgreSQL => write!(f, "PostgreSQL"),
            DatabaseType::MySQL => write!(f, "MySQL"),
            DatabaseType::SQLite => write!(f, "SQLite"),
        }
    }
}

/// A target table: name plus columns in profile field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// A target column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    /// Engine-specific type, e.g. `VARCHAR(20)` or `BIGINT`.
    pub sql_type: String,
    /// Declared type from the profile; decides how blanks are written.
    pub declared_type: FieldType,
}

impl ColumnDef {
    /// Blank values in non-text columns mean "no value" and are stored as NULL.
    pub fn blank_is_null(&self) -> bool {
        !self.declared_type.is_text()
    }
}
