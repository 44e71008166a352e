//! # Key Value Pool
//!
//! Identifier columns are usually truncated in a scan (too many distinct
//! values to list), so their own profile carries no sample. When another
//! table profiles a column of the same name *with* a full sample, those
//! values are collected here and the truncated column cycles through them,
//! which keeps joins on that column plausible in the generated data.
//!
//! The pool is built from profiles only, never from generated rows, and is
//! read-only once built.

use std::collections::{BTreeMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::profile::DatabaseProfile;

/// How a truncated field finds donor fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyMatching {
    /// Any non-truncated field with the same bare name, in any table.
    #[default]
    FieldName,
    /// Only the donors explicitly linked to the truncated field.
    ///
    /// Keys and donors are both `"table.field"`.
    Qualified(BTreeMap<String, Vec<String>>),
}

/// Donor values per consumer key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPool {
    qualified: bool,
    entries: IndexMap<String, IndexSet<String>>,
}

impl KeyPool {
    /// Scan every field of every table once and collect donor values.
    pub fn build(profile: &DatabaseProfile, matching: &KeyMatching) -> Self {
        let pool = match matching {
            KeyMatching::FieldName => Self::build_by_name(profile),
            KeyMatching::Qualified(links) => Self::build_qualified(profile, links),
        };
        debug!(
            "Key pool built: {} entries, {} values",
            pool.entries.len(),
            pool.value_count()
        );
        pool
    }

    fn build_by_name(profile: &DatabaseProfile) -> Self {
        let eligible: HashSet<&str> = profile
            .tables
            .iter()
            .flat_map(|t| t.fields.iter())
            .filter(|f| f.is_truncated())
            .map(|f| f.name.as_str())
            .collect();

        let mut entries: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for table in &profile.tables {
            for field in &table.fields {
                if field.is_truncated() || !eligible.contains(field.name.as_str()) {
                    continue;
                }
                let entry = entries.entry(field.name.clone()).or_default();
                for value in field.observed_values() {
                    entry.insert(value.to_string());
                }
            }
        }

        Self {
            qualified: false,
            entries,
        }
    }

    fn build_qualified(profile: &DatabaseProfile, links: &BTreeMap<String, Vec<String>>) -> Self {
        let mut entries: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for table in &profile.tables {
            for field in table.fields.iter().filter(|f| f.is_truncated()) {
                let key = qualified_key(&table.name, &field.name);
                let Some(donors) = links.get(&key) else {
                    continue;
                };
                let entry = entries.entry(key.clone()).or_default();
                for donor in donors {
                    let donor_field = donor
                        .split_once('.')
                        .and_then(|(t, f)| profile.table(t).and_then(|t| t.field(f)));
                    match donor_field {
                        Some(d) if !d.is_truncated() => {
                            for value in d.observed_values() {
                                entry.insert(value.to_string());
                            }
                        }
                        Some(_) => {
                            debug!("Donor {} for {} is truncated, skipping", donor, key);
                        }
                        None => {
                            warn!(
                                "Key link '{}' -> '{}' does not name a profiled field. Ignoring.",
                                key, donor
                            );
                        }
                    }
                }
            }
        }

        Self {
            qualified: true,
            entries,
        }
    }

    /// Donor values for a field, in first-seen order.
    pub fn values_for(&self, table: &str, field: &str) -> Option<&IndexSet<String>> {
        if self.qualified {
            self.entries.get(&qualified_key(table, field))
        } else {
            self.entries.get(field)
        }
    }

    /// Number of donor values available to a field (0 = none).
    pub fn pool_size(&self, table: &str, field: &str) -> usize {
        self.values_for(table, field).map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|v| v.is_empty())
    }

    /// Entry keys: bare field names, or `table.field` in qualified mode.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn value_count(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }
}

fn qualified_key(table: &str, field: &str) -> String {
    format!("{}.{}", table, field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{FieldProfile, FieldType, TableProfile, TRUNCATION_MARKER};

    fn patient_profile() -> DatabaseProfile {
        let visits = TableProfile::new("visits")
            .with_field(FieldProfile::truncated("patient_id", FieldType::VarChar, 2));
        let patients = TableProfile::new("patients").with_field(
            FieldProfile::new("patient_id", FieldType::VarChar, 2)
                .with_counts(&[("P1", "3"), ("P2", "2")]),
        );
        DatabaseProfile::new(vec![visits, patients]).unwrap()
    }

    #[test]
    fn test_same_name_donor_fills_pool() {
        let pool = KeyPool::build(&patient_profile(), &KeyMatching::FieldName);
        let values: Vec<&String> = pool.values_for("visits", "patient_id").unwrap().iter().collect();
        assert_eq!(values, vec!["P1", "P2"]);
        // Bare-name lookup ignores the table.
        assert_eq!(pool.pool_size("anything", "patient_id"), 2);
    }

    #[test]
    fn test_names_never_truncated_are_not_pooled() {
        let table = TableProfile::new("person").with_field(
            FieldProfile::new("gender", FieldType::VarChar, 1).with_counts(&[("M", "5"), ("F", "5")]),
        );
        let profile = DatabaseProfile::new(vec![table]).unwrap();
        let pool = KeyPool::build(&profile, &KeyMatching::FieldName);
        assert!(pool.values_for("person", "gender").is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_truncated_everywhere_has_no_donors() {
        let a = TableProfile::new("a").with_field(FieldProfile::truncated("id", FieldType::Integer, 6));
        let b = TableProfile::new("b").with_field(FieldProfile::truncated("id", FieldType::Integer, 6));
        let profile = DatabaseProfile::new(vec![a, b]).unwrap();
        let pool = KeyPool::build(&profile, &KeyMatching::FieldName);
        assert_eq!(pool.pool_size("a", "id"), 0);
    }

    #[test]
    fn test_blank_and_marker_values_excluded_and_deduplicated() {
        let consumer = TableProfile::new("c").with_field(FieldProfile::truncated("code", FieldType::VarChar, 3));
        let donor1 = TableProfile::new("d1").with_field(
            FieldProfile::new("code", FieldType::VarChar, 3).with_counts(&[
                ("X", "1"),
                ("", "4"),
                ("Y", "2"),
                (TRUNCATION_MARKER, ""),
            ]),
        );
        let donor2 = TableProfile::new("d2").with_field(
            FieldProfile::new("code", FieldType::VarChar, 3).with_counts(&[("Y", "7"), ("Z", "1")]),
        );
        let profile = DatabaseProfile::new(vec![consumer, donor1, donor2]).unwrap();
        let pool = KeyPool::build(&profile, &KeyMatching::FieldName);
        let values: Vec<&str> = pool
            .values_for("c", "code")
            .unwrap()
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(values, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn test_build_is_repeatable() {
        let profile = patient_profile();
        let first = KeyPool::build(&profile, &KeyMatching::FieldName);
        let second = KeyPool::build(&profile, &KeyMatching::FieldName);
        assert_eq!(first, second);
    }

    #[test]
    fn test_qualified_mode_requires_explicit_link() {
        let profile = patient_profile();

        let unlinked = KeyPool::build(&profile, &KeyMatching::Qualified(BTreeMap::new()));
        assert_eq!(unlinked.pool_size("visits", "patient_id"), 0);

        let mut links = BTreeMap::new();
        links.insert(
            "visits.patient_id".to_string(),
            vec!["patients.patient_id".to_string(), "nowhere.patient_id".to_string()],
        );
        let linked = KeyPool::build(&profile, &KeyMatching::Qualified(links));
        assert_eq!(linked.pool_size("visits", "patient_id"), 2);
        // Other tables do not inherit the link.
        assert_eq!(linked.pool_size("patients", "patient_id"), 0);
    }
}
