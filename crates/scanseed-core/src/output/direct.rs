//! # Direct Database Output
//!
//! Writes generated tables straight into a live database through sqlx.
//!
//! Each table gets its own `CREATE TABLE`, then all of its rows go in as
//! batched multi-row `INSERT` statements inside one transaction, so a table
//! is either fully written or left empty. Values are sent as quoted literals;
//! the database coerces them to the column type. A blank value in a non-text
//! column is written as `NULL`.
//!
//! - **PostgreSQL** and **MySQL** share a small pool so several tables can be
//!   written concurrently.
//! - **SQLite** uses a single connection; concurrent table writers queue on it.

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use super::BulkSink;
use crate::error::{Result, ScanSeedError};
use crate::generate::populate::Row;
use crate::schema::database_type_from_url;
use crate::schema::types::{ColumnDef, DatabaseType, TableDef};

/// Batch size for multi-row INSERT statements.
const INSERT_BATCH_SIZE: usize = 100;

/// Longest SQL excerpt carried in an error message.
const SQL_PREVIEW_LEN: usize = 200;

/// A connection pool for one of the supported engines.
#[derive(Debug, Clone)]
pub enum SqlxSink {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

impl SqlxSink {
    /// Connect to the database named by `db_url`.
    ///
    /// `max_connections` is ignored for SQLite, which always gets one.
    pub async fn connect(db_url: &str, max_connections: u32) -> Result<Self> {
        let connection_error = |e: sqlx::Error| ScanSeedError::Connection {
            message: "Failed to connect to target database".to_string(),
            connection_hint: sanitize_url(db_url),
            source: e,
        };
        let max_connections = max_connections.max(1);

        let sink = match database_type_from_url(db_url)? {
            DatabaseType::PostgreSQL => SqlxSink::Postgres(
                PgPoolOptions::new()
                    .max_connections(max_connections)
                    .connect(db_url)
                    .await
                    .map_err(connection_error)?,
            ),
            DatabaseType::MySQL => SqlxSink::MySql(
                MySqlPoolOptions::new()
                    .max_connections(max_connections)
                    .connect(db_url)
                    .await
                    .map_err(connection_error)?,
            ),
            DatabaseType::SQLite => SqlxSink::Sqlite(
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect(db_url)
                    .await
                    .map_err(connection_error)?,
            ),
        };
        debug!("connected to {} at {}", sink.database_type(), sanitize_url(db_url));
        Ok(sink)
    }

    pub fn database_type(&self) -> DatabaseType {
        match self {
            SqlxSink::Postgres(_) => DatabaseType::PostgreSQL,
            SqlxSink::MySql(_) => DatabaseType::MySQL,
            SqlxSink::Sqlite(_) => DatabaseType::SQLite,
        }
    }

    /// Run a single statement outside any transaction.
    async fn execute(&self, table: &str, operation: &str, sql: &str) -> Result<()> {
        let result = match self {
            SqlxSink::Postgres(pool) => sqlx::query(sql).execute(pool).await.map(|_| ()),
            SqlxSink::MySql(pool) => sqlx::query(sql).execute(pool).await.map(|_| ()),
            SqlxSink::Sqlite(pool) => sqlx::query(sql).execute(pool).await.map(|_| ()),
        };
        result.map_err(|e| statement_failed(table, operation, "Statement failed", sql, e))
    }
}

impl BulkSink for SqlxSink {
    async fn create_table(&self, table: &TableDef) -> Result<()> {
        let sql = build_create_table(table, self.database_type());
        self.execute(&table.name, "create_table", &sql).await
    }

    async fn insert_rows(&self, table: &TableDef, rows: &[Row]) -> Result<()> {
        if rows.is_empty() || table.columns.is_empty() {
            return Ok(());
        }
        match self {
            SqlxSink::Postgres(pool) => insert_postgres(pool, table, rows).await,
            SqlxSink::MySql(pool) => insert_mysql(pool, table, rows).await,
            SqlxSink::Sqlite(pool) => insert_sqlite(pool, table, rows).await,
        }
    }

    async fn drop_table(&self, table_name: &str) -> Result<()> {
        let sql = format!(
            "DROP TABLE IF EXISTS {}",
            quote_identifier(table_name, self.database_type())
        );
        self.execute(table_name, "drop_table", &sql).await
    }
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

async fn insert_postgres(pool: &PgPool, table: &TableDef, rows: &[Row]) -> Result<()> {
    let db_type = DatabaseType::PostgreSQL;
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| statement_failed(&table.name, "insert_rows", "Failed to begin transaction", "BEGIN", e))?;

    for chunk in rows.chunks(INSERT_BATCH_SIZE) {
        let sql = build_batched_insert(table, chunk, db_type);
        sqlx::query(&sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| statement_failed(&table.name, "insert_rows", "Batched INSERT failed", &sql, e))?;
    }

    tx.commit()
        .await
        .map_err(|e| statement_failed(&table.name, "insert_rows", "Failed to commit transaction", "COMMIT", e))
}

// ---------------------------------------------------------------------------
// MySQL
// ---------------------------------------------------------------------------

async fn insert_mysql(pool: &MySqlPool, table: &TableDef, rows: &[Row]) -> Result<()> {
    let db_type = DatabaseType::MySQL;
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| statement_failed(&table.name, "insert_rows", "Failed to begin transaction", "BEGIN", e))?;

    for chunk in rows.chunks(INSERT_BATCH_SIZE) {
        let sql = build_batched_insert(table, chunk, db_type);
        sqlx::query(&sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| statement_failed(&table.name, "insert_rows", "Batched INSERT failed", &sql, e))?;
    }

    tx.commit()
        .await
        .map_err(|e| statement_failed(&table.name, "insert_rows", "Failed to commit transaction", "COMMIT", e))
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

async fn insert_sqlite(pool: &SqlitePool, table: &TableDef, rows: &[Row]) -> Result<()> {
    let db_type = DatabaseType::SQLite;
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| statement_failed(&table.name, "insert_rows", "Failed to begin transaction", "BEGIN", e))?;

    for chunk in rows.chunks(INSERT_BATCH_SIZE) {
        let sql = build_batched_insert(table, chunk, db_type);
        sqlx::query(&sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                statement_failed(&table.name, "insert_rows", "INSERT failed within transaction", &sql, e)
            })?;
    }

    tx.commit()
        .await
        .map_err(|e| statement_failed(&table.name, "insert_rows", "Failed to commit transaction", "COMMIT", e))
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn statement_failed(table: &str, operation: &str, message: &str, sql: &str, source: sqlx::Error) -> ScanSeedError {
    ScanSeedError::StatementFailed {
        table: table.to_string(),
        operation: operation.to_string(),
        message: message.to_string(),
        sql_preview: truncate_sql(sql, SQL_PREVIEW_LEN),
        source,
    }
}

/// Build `CREATE TABLE "t" ("a" BIGINT, "b" VARCHAR(20))`.
fn build_create_table(table: &TableDef, db_type: DatabaseType) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_identifier(&c.name, db_type), c.sql_type))
        .collect();
    format!(
        "CREATE TABLE {} ({})",
        quote_identifier(&table.name, db_type),
        columns.join(", ")
    )
}

/// Build a batched multi-row INSERT statement.
///
/// Produces: `INSERT INTO "table" ("col1", "col2") VALUES ('v1', 'v2'), ('v3', NULL)`
fn build_batched_insert(table: &TableDef, rows: &[Row], db_type: DatabaseType) -> String {
    let col_list: Vec<String> = table
        .column_names()
        .map(|c| quote_identifier(c, db_type))
        .collect();
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ",
        quote_identifier(&table.name, db_type),
        col_list.join(", ")
    );

    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for (j, column) in table.columns.iter().enumerate() {
            if j > 0 {
                sql.push_str(", ");
            }
            let value = row.get(&column.name).map(String::as_str).unwrap_or("");
            sql.push_str(&sql_literal(value, column, db_type));
        }
        sql.push(')');
    }

    sql
}

/// Render a value as a SQL literal for the given column.
fn sql_literal(value: &str, column: &ColumnDef, db_type: DatabaseType) -> String {
    if value.is_empty() && column.blank_is_null() {
        return "NULL".to_string();
    }
    let escaped = match db_type {
        DatabaseType::MySQL => value.replace('\\', "\\\\").replace('\'', "''"),
        _ => value.replace('\'', "''"),
    };
    format!("'{}'", escaped)
}

/// Quote a SQL identifier based on database type.
fn quote_identifier(name: &str, db_type: DatabaseType) -> String {
    match db_type {
        DatabaseType::MySQL => format!("`{}`", name.replace('`', "``")),
        _ => format!("\"{}\"", name.replace('"', "\"\"")),
    }
}

/// Truncate a SQL string for error messages.
fn truncate_sql(sql: &str, max_len: usize) -> String {
    if sql.len() <= max_len {
        return sql.to_string();
    }
    let mut end = max_len;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &sql[..end])
}

/// Sanitize a database URL for error messages (hide password).
pub fn sanitize_url(db_url: &str) -> String {
    if let Ok(mut parsed) = url::Url::parse(db_url) {
        if parsed.password().is_some() {
            let _ = parsed.set_password(Some("****"));
        }
        return parsed.to_string();
    }
    // SQLite file paths don't always parse as URLs
    db_url.to_string()
}
