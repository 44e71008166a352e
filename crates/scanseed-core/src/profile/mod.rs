//! # Scan Profiles
//!
//! The statistical summary of a source database that generation works from:
//! per table, per field, a declared type, a maximum length and a sampled
//! value/frequency list. No real rows ever pass through ScanSeed, only these
//! profiles.
//!
//! A sampled list whose *first* entry is [`TRUNCATION_MARKER`] means the scan
//! gave up listing values (high-cardinality columns such as identifiers). A
//! marker at the *end* of a real sample, with an empty count, is only a footer
//! saying the tail was cut; the sample before it is still usable.

pub mod load;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanSeedError};

/// Reserved value the scanner writes when a value list was not recorded.
pub const TRUNCATION_MARKER: &str = "List truncated...";

/// Declared type of a profiled field.
///
/// Closed set of types the scanner emits. Anything else is carried verbatim
/// in `Other` so the type mapper can reject it with the original spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Integer,
    Real,
    Date,
    VarChar,
    /// No non-blank value was ever observed.
    Empty,
    Other(String),
}

impl FieldType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => FieldType::Integer,
            "real" => FieldType::Real,
            "date" => FieldType::Date,
            "varchar" => FieldType::VarChar,
            "empty" => FieldType::Empty,
            _ => FieldType::Other(raw.to_string()),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, FieldType::VarChar)
    }
}

impl From<String> for FieldType {
    fn from(raw: String) -> Self {
        FieldType::parse(&raw)
    }
}

impl From<FieldType> for String {
    fn from(ty: FieldType) -> Self {
        ty.to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Integer => write!(f, "Integer"),
            FieldType::Real => write!(f, "Real"),
            FieldType::Date => write!(f, "Date"),
            FieldType::VarChar => write!(f, "VarChar"),
            FieldType::Empty => write!(f, "Empty"),
            FieldType::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// One `(value, count)` entry of a sampled distribution.
///
/// Both halves stay textual: the count slot may hold a number, nothing at all
/// (truncation footer), or garbage that must be reported rather than guessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ValueCountRepr", into = "ValueCountRepr")]
pub struct ValueCount {
    pub value: String,
    pub count: String,
}

impl ValueCount {
    pub fn new(value: impl Into<String>, count: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            count: count.into(),
        }
    }

    pub fn is_marker(&self) -> bool {
        self.value == TRUNCATION_MARKER
    }

    pub fn has_blank_count(&self) -> bool {
        self.count.trim().is_empty()
    }
}

/// On-disk shape: `["value", 12]` or `["value", "12"]`.
#[derive(Serialize, Deserialize)]
struct ValueCountRepr(String, RawCount);

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawCount {
    Number(f64),
    Text(String),
}

impl From<ValueCountRepr> for ValueCount {
    fn from(repr: ValueCountRepr) -> Self {
        let count = match repr.1 {
            RawCount::Number(n) => n.to_string(),
            RawCount::Text(s) => s,
        };
        ValueCount {
            value: repr.0,
            count,
        }
    }
}

impl From<ValueCount> for ValueCountRepr {
    fn from(vc: ValueCount) -> Self {
        ValueCountRepr(vc.value, RawCount::Text(vc.count))
    }
}

/// Statistics for one field of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldProfile {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: FieldType,
    #[serde(default)]
    pub max_length: usize,
    #[serde(default)]
    pub value_counts: Vec<ValueCount>,
}

impl FieldProfile {
    pub fn new(name: impl Into<String>, declared_type: FieldType, max_length: usize) -> Self {
        Self {
            name: name.into(),
            declared_type,
            max_length,
            value_counts: Vec::new(),
        }
    }

    /// Builder-style helper used by fixtures and tests.
    pub fn with_counts(mut self, counts: &[(&str, &str)]) -> Self {
        self.value_counts = counts
            .iter()
            .map(|(v, c)| ValueCount::new(*v, *c))
            .collect();
        self
    }

    /// A field profiled with only the truncation marker.
    pub fn truncated(name: impl Into<String>, declared_type: FieldType, max_length: usize) -> Self {
        Self::new(name, declared_type, max_length).with_counts(&[(TRUNCATION_MARKER, "")])
    }

    /// The scan did not record a usable sample for this field.
    pub fn is_truncated(&self) -> bool {
        self.value_counts.first().is_some_and(ValueCount::is_marker)
    }

    /// Concrete sampled values, skipping blanks and markers.
    pub fn observed_values(&self) -> impl Iterator<Item = &str> {
        self.value_counts
            .iter()
            .filter(|vc| !vc.value.is_empty() && !vc.is_marker())
            .map(|vc| vc.value.as_str())
    }
}

/// Statistics for one table; field order is column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableProfile {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldProfile>,
}

impl TableProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldProfile) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldProfile> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// The whole scan: every profiled table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseProfile {
    #[serde(default)]
    pub tables: Vec<TableProfile>,
}

impl DatabaseProfile {
    /// Build a profile, rejecting duplicate table or field names.
    pub fn new(tables: Vec<TableProfile>) -> Result<Self> {
        let profile = Self { tables };
        profile.validate()?;
        Ok(profile)
    }

    pub fn table(&self, name: &str) -> Option<&TableProfile> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn field_count(&self) -> usize {
        self.tables.iter().map(|t| t.fields.len()).sum()
    }

    /// Check the structural invariants serde cannot enforce.
    pub fn validate(&self) -> Result<()> {
        let mut table_names = HashSet::new();
        for table in &self.tables {
            if !table_names.insert(table.name.as_str()) {
                return Err(ScanSeedError::Config {
                    message: format!("Table '{}' is profiled more than once", table.name),
                });
            }
            let mut field_names = HashSet::new();
            for field in &table.fields {
                if !field_names.insert(field.name.as_str()) {
                    return Err(ScanSeedError::ProfileMalformed {
                        table: table.name.clone(),
                        field: field.name.clone(),
                        message: "field is profiled more than once".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
