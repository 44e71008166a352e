pub mod mapper;
pub mod types;

use crate::error::{Result, ScanSeedError};
use types::DatabaseType;

/// Determine the target engine from a connection URL.
pub fn database_type_from_url(url: &str) -> Result<DatabaseType> {
    let scheme = url.split("://").next().unwrap_or("");
    match scheme {
        "postgres" | "postgresql" => Ok(DatabaseType::PostgreSQL),
        "mysql" | "mariadb" => Ok(DatabaseType::MySQL),
        "sqlite" | "file" => Ok(DatabaseType::SQLite),
        other => Err(ScanSeedError::UnsupportedDatabase {
            scheme: other.to_string(),
        }),
    }
}
