//! # Table Population
//!
//! Builds the rows of one table: one value generator per field, a row count
//! capped by the smallest key pool, and rows produced field-by-field in
//! table order.

use indexmap::IndexMap;

use crate::error::Result;
use crate::generate::key_pool::KeyPool;
use crate::generate::value::{field_seed, ValueGenerator};
use crate::profile::TableProfile;

/// One generated row: field name to value, in table field order.
pub type Row = IndexMap<String, String>;

/// The number of rows a table can be given.
///
/// Starts from the ceiling and takes the minimum with every key-cycling
/// field's pool size, so no key column is forced to repeat unless the
/// ceiling itself is below every pool.
pub fn effective_row_count(row_ceiling: usize, generators: &[ValueGenerator]) -> usize {
    generators
        .iter()
        .filter_map(ValueGenerator::row_bound)
        .fold(row_ceiling, usize::min)
}

/// Produces the rows of one table.
pub struct TablePopulator<'a> {
    table: &'a TableProfile,
    generators: Vec<ValueGenerator>,
    row_count: usize,
    produced: usize,
}

impl<'a> TablePopulator<'a> {
    /// Build a generator for every field.
    ///
    /// Fails with `ProfileMalformed` if any field's sample cannot be used;
    /// the whole table is then skipped.
    pub fn new(table: &'a TableProfile, key_pool: &KeyPool, row_ceiling: usize, seed: u64) -> Result<Self> {
        let generators = table
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                ValueGenerator::for_field(&table.name, field, key_pool, field_seed(seed, &table.name, index))
            })
            .collect::<Result<Vec<_>>>()?;

        let row_count = effective_row_count(row_ceiling, &generators);
        Ok(Self {
            table,
            generators,
            row_count,
            produced: 0,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table.name
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn produced(&self) -> usize {
        self.produced
    }

    pub fn is_finished(&self) -> bool {
        self.produced >= self.row_count
    }

    /// Generate up to `max_rows` more rows.
    pub fn next_batch(&mut self, max_rows: usize) -> Vec<Row> {
        let n = max_rows.min(self.row_count - self.produced);
        let mut rows = Vec::with_capacity(n);
        for _ in 0..n {
            rows.push(self.next_row());
        }
        self.produced += n;
        rows
    }

    /// Generate every remaining row.
    pub fn generate_all(mut self) -> Vec<Row> {
        let remaining = self.row_count - self.produced;
        self.next_batch(remaining)
    }

    fn next_row(&mut self) -> Row {
        let mut row = IndexMap::with_capacity(self.generators.len());
        for (field, generator) in self.table.fields.iter().zip(self.generators.iter_mut()) {
            row.insert(field.name.clone(), generator.generate());
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::key_pool::KeyMatching;
    use crate::profile::{DatabaseProfile, FieldProfile, FieldType};
    use std::collections::HashSet;

    fn visit_profile(pool_values: &[(&str, &str)]) -> DatabaseProfile {
        let visits = TableProfile::new("visits")
            .with_field(FieldProfile::truncated("patient_id", FieldType::VarChar, 2))
            .with_field(
                FieldProfile::new("visit_type", FieldType::VarChar, 3)
                    .with_counts(&[("IP", "1"), ("OP", "3")]),
            );
        let patients = TableProfile::new("patients")
            .with_field(FieldProfile::new("patient_id", FieldType::VarChar, 2).with_counts(pool_values));
        DatabaseProfile::new(vec![visits, patients]).unwrap()
    }

    #[test]
    fn test_row_count_capped_by_pool() {
        let profile = visit_profile(&[("P1", "3"), ("P2", "2")]);
        let pool = KeyPool::build(&profile, &KeyMatching::FieldName);
        let populator = TablePopulator::new(&profile.tables[0], &pool, 1000, 1).unwrap();
        assert_eq!(populator.row_count(), 2);
    }

    #[test]
    fn test_row_count_capped_by_ceiling() {
        let profile = visit_profile(&[("P1", "3"), ("P2", "2"), ("P3", "1")]);
        let pool = KeyPool::build(&profile, &KeyMatching::FieldName);
        let populator = TablePopulator::new(&profile.tables[0], &pool, 2, 1).unwrap();
        assert_eq!(populator.row_count(), 2);

        let rows = populator.generate_all();
        let ids: HashSet<&str> = rows.iter().map(|r| r["patient_id"].as_str()).collect();
        assert_eq!(ids.len(), 2, "key values must not repeat within the pool size");
    }

    #[test]
    fn test_unbounded_table_uses_ceiling() {
        let profile = visit_profile(&[("P1", "3")]);
        let pool = KeyPool::build(&profile, &KeyMatching::FieldName);
        let populator = TablePopulator::new(&profile.tables[1], &pool, 25, 1).unwrap();
        assert_eq!(populator.row_count(), 25);
        assert_eq!(populator.generate_all().len(), 25);
    }

    #[test]
    fn test_rows_follow_field_order() {
        let profile = visit_profile(&[("P1", "3"), ("P2", "2")]);
        let pool = KeyPool::build(&profile, &KeyMatching::FieldName);
        let rows = TablePopulator::new(&profile.tables[0], &pool, 10, 1)
            .unwrap()
            .generate_all();
        for row in &rows {
            let keys: Vec<&String> = row.keys().collect();
            assert_eq!(keys, vec!["patient_id", "visit_type"]);
            assert!(row["visit_type"] == "IP" || row["visit_type"] == "OP");
        }
    }

    #[test]
    fn test_batches_cover_all_rows() {
        let profile = visit_profile(&[("P1", "1")]);
        let pool = KeyPool::build(&profile, &KeyMatching::FieldName);
        let mut populator = TablePopulator::new(&profile.tables[1], &pool, 10, 1).unwrap();

        let mut sizes = Vec::new();
        while !populator.is_finished() {
            sizes.push(populator.next_batch(4).len());
        }
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(populator.produced(), 10);
        assert!(populator.next_batch(4).is_empty());
    }

    #[test]
    fn test_malformed_field_fails_table() {
        let table = TableProfile::new("person").with_field(
            FieldProfile::new("year_of_birth", FieldType::Integer, 4).with_counts(&[("1970", "x")]),
        );
        let result = TablePopulator::new(&table, &KeyPool::default(), 10, 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_effective_row_count_takes_smallest_pool() {
        let gens = vec![
            ValueGenerator::KeyCycle(crate::generate::value::KeyCycler::new(vec!["a".into(); 5])),
            ValueGenerator::KeyCycle(crate::generate::value::KeyCycler::new(vec!["b".into(); 3])),
        ];
        assert_eq!(effective_row_count(100, &gens), 3);
        assert_eq!(effective_row_count(2, &gens), 2);
        assert_eq!(effective_row_count(7, &[]), 7);
    }
}
