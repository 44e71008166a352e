//! # Type Mapping
//!
//! Turns a profiled field's declared type and maximum length into a column
//! type for the target engine. Each engine is one `TypeMapper`; callers that
//! need a different dialect implement the trait themselves.
//!
//! A declared type outside the known set is an error. Emitting the raw type
//! name, or no type at all, would only move the failure into the `CREATE
//! TABLE` statement.

use crate::error::{Result, ScanSeedError};
use crate::profile::{FieldType, TableProfile};
use crate::schema::types::{ColumnDef, DatabaseType, TableDef};

/// Width used when nothing was observed for a field.
pub const EMPTY_FIELD_WIDTH: usize = 255;

/// Maps declared field types to target column types.
pub trait TypeMapper: Send + Sync {
    /// Column type for a declared type, or `None` if the type is not mappable.
    fn column_type(&self, declared_type: &FieldType, max_length: usize) -> Option<String>;
}

impl TypeMapper for DatabaseType {
    fn column_type(&self, declared_type: &FieldType, max_length: usize) -> Option<String> {
        let mapped = match (declared_type, self) {
            // PostgreSQL rejects VARCHAR(0).
            (FieldType::VarChar, DatabaseType::PostgreSQL) => format!("VARCHAR({})", max_length.max(1)),
            (FieldType::VarChar, _) => format!("VARCHAR({})", max_length),
            // Profiled integers are not assumed to fit in 32 bits.
            (FieldType::Integer, _) => "BIGINT".to_string(),
            (FieldType::Real, DatabaseType::PostgreSQL) => "DOUBLE PRECISION".to_string(),
            (FieldType::Real, _) => "DOUBLE".to_string(),
            (FieldType::Date, _) => "DATE".to_string(),
            (FieldType::Empty, _) => format!("VARCHAR({})", EMPTY_FIELD_WIDTH),
            (FieldType::Other(_), _) => return None,
        };
        Some(mapped)
    }
}

/// Map every field of a table, in order.
pub fn table_definition(table: &TableProfile, mapper: &dyn TypeMapper) -> Result<TableDef> {
    let columns = table
        .fields
        .iter()
        .map(|field| {
            let sql_type = mapper
                .column_type(&field.declared_type, field.max_length)
                .ok_or_else(|| ScanSeedError::UnmappedType {
                    table: table.name.clone(),
                    field: field.name.clone(),
                    declared_type: field.declared_type.to_string(),
                })?;
            Ok(ColumnDef {
                name: field.name.clone(),
                sql_type,
                declared_type: field.declared_type.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TableDef {
        name: table.name.clone(),
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::FieldProfile;

    #[test]
    fn test_mysql_mapping() {
        let db = DatabaseType::MySQL;
        assert_eq!(db.column_type(&FieldType::VarChar, 20).unwrap(), "VARCHAR(20)");
        assert_eq!(db.column_type(&FieldType::Integer, 4).unwrap(), "BIGINT");
        assert_eq!(db.column_type(&FieldType::Real, 8).unwrap(), "DOUBLE");
        assert_eq!(db.column_type(&FieldType::Date, 10).unwrap(), "DATE");
        assert_eq!(db.column_type(&FieldType::Empty, 0).unwrap(), "VARCHAR(255)");
    }

    #[test]
    fn test_postgres_mapping() {
        let db = DatabaseType::PostgreSQL;
        assert_eq!(db.column_type(&FieldType::Real, 8).unwrap(), "DOUBLE PRECISION");
        assert_eq!(db.column_type(&FieldType::VarChar, 0).unwrap(), "VARCHAR(1)");
        assert_eq!(db.column_type(&FieldType::Integer, 4).unwrap(), "BIGINT");
    }

    #[test]
    fn test_unrecognized_type_is_rejected() {
        for db in [DatabaseType::PostgreSQL, DatabaseType::MySQL, DatabaseType::SQLite] {
            assert!(db
                .column_type(&FieldType::Other("Frobnicate".to_string()), 10)
                .is_none());
        }
    }

    #[test]
    fn test_table_definition_keeps_field_order() {
        let table = TableProfile::new("person")
            .with_field(FieldProfile::truncated("person_id", FieldType::Integer, 8))
            .with_field(FieldProfile::truncated("gender", FieldType::VarChar, 1))
            .with_field(FieldProfile::truncated("birth_date", FieldType::Date, 10));
        let def = table_definition(&table, &DatabaseType::SQLite).unwrap();
        let names: Vec<&str> = def.column_names().collect();
        assert_eq!(names, vec!["person_id", "gender", "birth_date"]);
        assert_eq!(def.columns[1].sql_type, "VARCHAR(1)");
        assert!(def.columns[0].blank_is_null());
        assert!(!def.columns[1].blank_is_null());
    }

    #[test]
    fn test_unmapped_field_fails_whole_table() {
        let table = TableProfile::new("observation")
            .with_field(FieldProfile::truncated("id", FieldType::Integer, 8))
            .with_field(FieldProfile::truncated("flag", FieldType::parse("Frobnicate"), 1));
        let err = table_definition(&table, &DatabaseType::MySQL).unwrap_err();
        match err {
            ScanSeedError::UnmappedType {
                table,
                field,
                declared_type,
            } => {
                assert_eq!(table, "observation");
                assert_eq!(field, "flag");
                assert_eq!(declared_type, "Frobnicate");
            }
            other => panic!("expected UnmappedType, got {:?}", other),
        }
    }
}
