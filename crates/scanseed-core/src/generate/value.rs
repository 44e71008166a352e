//! # Value Generators
//!
//! One generator per field per table pass. The strategy is fixed when the
//! generator is built:
//!
//! - **Key cycle**: the field was truncated but the key pool has donor
//!   values. Values are handed out round-robin, so the first `pool_size`
//!   rows never repeat.
//! - **Blind random**: truncated with no donors. Produces a string of the
//!   declared length with no regard to the original distribution.
//! - **Weighted**: the profile carries a real sample. Values are drawn in
//!   proportion to their observed counts.
//!
//! Every generator owns its own seeded RNG, so generators never share state
//! and a run is reproducible from its seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::error::{Result, ScanSeedError};
use crate::generate::key_pool::KeyPool;
use crate::generate::plan::GenerationStrategy;
use crate::profile::{FieldProfile, FieldType};

/// Derive the seed of one field's generator from the run seed.
///
/// Hashing keeps neighbouring fields from getting correlated streams, and
/// keeps a table's output independent of which other tables are in the run.
pub fn field_seed(run_seed: u64, table: &str, field_index: usize) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(run_seed.to_le_bytes());
    hasher.update(table.as_bytes());
    hasher.update([0u8]);
    hasher.update((field_index as u64).to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// A per-field value source.
#[derive(Debug, Clone)]
pub enum ValueGenerator {
    KeyCycle(KeyCycler),
    BlindRandom(BlindRandom),
    Weighted(WeightedSampler),
}

impl ValueGenerator {
    /// Pick and build the strategy for one field.
    pub fn for_field(table: &str, field: &FieldProfile, pool: &KeyPool, seed: u64) -> Result<Self> {
        if field.is_truncated() {
            return Ok(match pool.values_for(table, &field.name) {
                Some(values) if !values.is_empty() => {
                    ValueGenerator::KeyCycle(KeyCycler::new(values.iter().cloned().collect()))
                }
                _ => ValueGenerator::BlindRandom(BlindRandom::new(
                    field.declared_type.clone(),
                    field.max_length,
                    seed,
                )),
            });
        }
        Ok(ValueGenerator::Weighted(WeightedSampler::new(table, field, seed)?))
    }

    /// Produce the next value.
    pub fn generate(&mut self) -> String {
        match self {
            ValueGenerator::KeyCycle(c) => c.next_value(),
            ValueGenerator::BlindRandom(r) => r.next_value(),
            ValueGenerator::Weighted(w) => w.next_value(),
        }
    }

    /// Pool size for key-cycling fields; other strategies impose no bound.
    pub fn row_bound(&self) -> Option<usize> {
        match self {
            ValueGenerator::KeyCycle(c) => Some(c.len()),
            _ => None,
        }
    }

    pub fn strategy(&self) -> GenerationStrategy {
        match self {
            ValueGenerator::KeyCycle(c) => GenerationStrategy::KeyCycle { pool_size: c.len() },
            ValueGenerator::BlindRandom(_) => GenerationStrategy::BlindRandom,
            ValueGenerator::Weighted(w) => GenerationStrategy::Weighted {
                distinct: w.values.len(),
                total_frequency: w.total,
            },
        }
    }
}

/// Round-robin over pooled key values.
#[derive(Debug, Clone)]
pub struct KeyCycler {
    values: Vec<String>,
    cursor: usize,
}

impl KeyCycler {
    /// `values` must be non-empty.
    pub fn new(values: Vec<String>) -> Self {
        Self { values, cursor: 0 }
    }

    pub fn next_value(&mut self) -> String {
        let value = self.values[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.values.len();
        value
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Shape-only values for fields with no usable sample.
#[derive(Debug, Clone)]
pub struct BlindRandom {
    declared_type: FieldType,
    length: usize,
    rng: StdRng,
}

impl BlindRandom {
    pub fn new(declared_type: FieldType, length: usize, seed: u64) -> Self {
        Self {
            declared_type,
            length,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// VarChar: `length` letters A-Z. Integer: `length` digits, as text.
    /// Every other type yields an empty string.
    pub fn next_value(&mut self) -> String {
        match self.declared_type {
            FieldType::VarChar => (0..self.length)
                .map(|_| char::from(b'A' + self.rng.random_range(0..26u8)))
                .collect(),
            FieldType::Integer => (0..self.length)
                .map(|_| char::from(b'0' + self.rng.random_range(0..10u8)))
                .collect(),
            FieldType::Real | FieldType::Date | FieldType::Empty | FieldType::Other(_) => {
                String::new()
            }
        }
    }
}

/// Frequency-proportional resampling of a profiled distribution.
#[derive(Debug, Clone)]
pub struct WeightedSampler {
    values: Vec<String>,
    cumulative: Vec<u64>,
    total: u64,
    declared_type: FieldType,
    rng: StdRng,
}

impl WeightedSampler {
    /// Build the cumulative table once.
    ///
    /// A trailing entry with an empty count is a truncation footer and is
    /// dropped; marker entries are skipped wherever they appear.
    pub fn new(table: &str, field: &FieldProfile, seed: u64) -> Result<Self> {
        let malformed = |message: String| ScanSeedError::ProfileMalformed {
            table: table.to_string(),
            field: field.name.clone(),
            message,
        };

        let mut sample = field.value_counts.as_slice();
        if let Some((last, rest)) = sample.split_last() {
            if last.has_blank_count() {
                sample = rest;
            }
        }

        let mut values = Vec::with_capacity(sample.len());
        let mut cumulative = Vec::with_capacity(sample.len());
        let mut total: u64 = 0;
        for entry in sample.iter().filter(|vc| !vc.is_marker()) {
            let frequency = parse_frequency(&entry.count).map_err(|reason| {
                malformed(format!(
                    "frequency '{}' for value '{}' {}",
                    entry.count, entry.value, reason
                ))
            })?;
            total = total.saturating_add(frequency);
            values.push(entry.value.clone());
            cumulative.push(total);
        }

        if values.is_empty() {
            return Err(malformed("no sampled values to draw from".to_string()));
        }
        if total == 0 {
            return Err(malformed("all sampled frequencies are zero".to_string()));
        }

        Ok(Self {
            values,
            cumulative,
            total,
            declared_type: field.declared_type.clone(),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn next_value(&mut self) -> String {
        let draw = self.rng.random_range(0..self.total);
        let index = self
            .cumulative
            .iter()
            .position(|&c| c > draw)
            .unwrap_or(self.values.len() - 1);
        let value = &self.values[index];
        if !self.declared_type.is_text() && value.trim().is_empty() {
            return String::new();
        }
        value.clone()
    }
}

/// Counts are decimals in scan reports; fractions are truncated.
fn parse_frequency(raw: &str) -> std::result::Result<u64, &'static str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    let parsed: f64 = trimmed.parse().map_err(|_| "is not a number")?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err("must be a non-negative number");
    }
    Ok(parsed as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::key_pool::KeyMatching;
    use crate::profile::{DatabaseProfile, TableProfile, TRUNCATION_MARKER};
    use std::collections::HashMap;

    fn empty_pool() -> KeyPool {
        KeyPool::default()
    }

    #[test]
    fn test_blind_random_varchar_is_uppercase_of_exact_length() {
        let field = FieldProfile::truncated("code", FieldType::VarChar, 12);
        let mut gen = ValueGenerator::for_field("t", &field, &empty_pool(), 7).unwrap();
        assert_eq!(gen.strategy(), GenerationStrategy::BlindRandom);
        for _ in 0..200 {
            let v = gen.generate();
            assert_eq!(v.len(), 12);
            assert!(v.chars().all(|c| c.is_ascii_uppercase()), "{}", v);
        }
    }

    #[test]
    fn test_blind_random_integer_is_digit_string() {
        let field = FieldProfile::truncated("person_id", FieldType::Integer, 9);
        let mut gen = ValueGenerator::for_field("t", &field, &empty_pool(), 7).unwrap();
        for _ in 0..200 {
            let v = gen.generate();
            assert_eq!(v.len(), 9);
            assert!(v.chars().all(|c| c.is_ascii_digit()), "{}", v);
        }
    }

    #[test]
    fn test_blind_random_other_types_are_blank() {
        for ty in [
            FieldType::Date,
            FieldType::Real,
            FieldType::Empty,
            FieldType::Other("Frobnicate".to_string()),
        ] {
            let field = FieldProfile::truncated("f", ty, 10);
            let mut gen = ValueGenerator::for_field("t", &field, &empty_pool(), 1).unwrap();
            assert_eq!(gen.generate(), "");
        }
    }

    #[test]
    fn test_key_cycle_wraps_in_pool_order() {
        let consumer = TableProfile::new("visits")
            .with_field(FieldProfile::truncated("patient_id", FieldType::VarChar, 2));
        let donor = TableProfile::new("patients").with_field(
            FieldProfile::new("patient_id", FieldType::VarChar, 2)
                .with_counts(&[("P1", "3"), ("P2", "2")]),
        );
        let profile = DatabaseProfile::new(vec![consumer, donor]).unwrap();
        let pool = KeyPool::build(&profile, &KeyMatching::FieldName);

        let field = &profile.tables[0].fields[0];
        let mut gen = ValueGenerator::for_field("visits", field, &pool, 0).unwrap();
        assert_eq!(gen.row_bound(), Some(2));
        let drawn: Vec<String> = (0..5).map(|_| gen.generate()).collect();
        assert_eq!(drawn, vec!["P1", "P2", "P1", "P2", "P1"]);
    }

    #[test]
    fn test_key_cycle_repeat_counts() {
        let mut cycler = KeyCycler::new(vec!["a".into(), "b".into(), "c".into()]);
        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..7 {
            *counts.entry(cycler.next_value()).or_default() += 1;
        }
        // ceil(7 / 3) = 3
        assert_eq!(counts.values().copied().max(), Some(3));
        assert_eq!(counts.values().sum::<usize>(), 7);
    }

    #[test]
    fn test_weighted_stays_in_domain() {
        let field = FieldProfile::new("gender", FieldType::VarChar, 1)
            .with_counts(&[("M", "510"), ("F", "490"), (TRUNCATION_MARKER, "")]);
        let mut gen = ValueGenerator::for_field("person", &field, &empty_pool(), 3).unwrap();
        assert_eq!(
            gen.strategy(),
            GenerationStrategy::Weighted {
                distinct: 2,
                total_frequency: 1000
            }
        );
        for _ in 0..500 {
            let v = gen.generate();
            assert!(v == "M" || v == "F", "unexpected {}", v);
        }
    }

    #[test]
    fn test_weighted_frequency_converges() {
        let field = FieldProfile::new("value_as_number", FieldType::Real, 4)
            .with_counts(&[("12.5", "10"), ("7.0", "5")]);
        let mut gen = ValueGenerator::for_field("measurement", &field, &empty_pool(), 42).unwrap();
        let draws = 30_000;
        let hits = (0..draws).filter(|_| gen.generate() == "12.5").count();
        let ratio = hits as f64 / draws as f64;
        assert!((ratio - 2.0 / 3.0).abs() < 0.03, "ratio was {}", ratio);
    }

    #[test]
    fn test_weighted_zero_count_value_never_drawn() {
        let field = FieldProfile::new("flag", FieldType::VarChar, 1)
            .with_counts(&[("never", "0"), ("always", "4")]);
        let mut gen = ValueGenerator::for_field("t", &field, &empty_pool(), 9).unwrap();
        for _ in 0..200 {
            assert_eq!(gen.generate(), "always");
        }
    }

    #[test]
    fn test_weighted_blank_becomes_empty_for_non_text() {
        let field = FieldProfile::new("year_of_birth", FieldType::Integer, 4)
            .with_counts(&[("  ", "5")]);
        let mut gen = ValueGenerator::for_field("person", &field, &empty_pool(), 1).unwrap();
        assert_eq!(gen.generate(), "");

        let text = FieldProfile::new("note", FieldType::VarChar, 4).with_counts(&[("  ", "5")]);
        let mut gen = ValueGenerator::for_field("person", &text, &empty_pool(), 1).unwrap();
        assert_eq!(gen.generate(), "  ");
    }

    #[test]
    fn test_blank_count_inside_sample_weighs_zero() {
        let field = FieldProfile::new("x", FieldType::VarChar, 1).with_counts(&[("a", ""), ("b", "3")]);
        let mut gen = ValueGenerator::for_field("t", &field, &empty_pool(), 5).unwrap();
        assert_eq!(
            gen.strategy(),
            GenerationStrategy::Weighted {
                distinct: 2,
                total_frequency: 3
            }
        );
        for _ in 0..200 {
            assert_eq!(gen.generate(), "b");
        }
    }

    #[test]
    fn test_decimal_counts_are_truncated() {
        let field = FieldProfile::new("x", FieldType::VarChar, 1).with_counts(&[("a", "2.9"), ("b", "1.0")]);
        let gen = ValueGenerator::for_field("t", &field, &empty_pool(), 1).unwrap();
        assert_eq!(
            gen.strategy(),
            GenerationStrategy::Weighted {
                distinct: 2,
                total_frequency: 3
            }
        );
    }

    #[test]
    fn test_non_numeric_count_is_fatal() {
        let field = FieldProfile::new("year_of_birth", FieldType::Integer, 4)
            .with_counts(&[("1970", "12"), ("1971", "lots")]);
        let err = ValueGenerator::for_field("person", &field, &empty_pool(), 1).unwrap_err();
        match err {
            ScanSeedError::ProfileMalformed { table, field, message } => {
                assert_eq!(table, "person");
                assert_eq!(field, "year_of_birth");
                assert!(message.contains("lots"));
            }
            other => panic!("expected ProfileMalformed, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_count_is_fatal() {
        let field = FieldProfile::new("x", FieldType::VarChar, 1).with_counts(&[("a", "-3")]);
        assert!(ValueGenerator::for_field("t", &field, &empty_pool(), 1).is_err());
    }

    #[test]
    fn test_empty_or_zero_sample_is_fatal() {
        let empty = FieldProfile::new("x", FieldType::VarChar, 1);
        assert!(ValueGenerator::for_field("t", &empty, &empty_pool(), 1).is_err());

        let zeros = FieldProfile::new("x", FieldType::VarChar, 1).with_counts(&[("a", "0"), ("b", "0")]);
        assert!(ValueGenerator::for_field("t", &zeros, &empty_pool(), 1).is_err());
    }

    #[test]
    fn test_same_seed_same_stream() {
        let field = FieldProfile::new("x", FieldType::VarChar, 1)
            .with_counts(&[("a", "1"), ("b", "1"), ("c", "1")]);
        let mut g1 = ValueGenerator::for_field("t", &field, &empty_pool(), 99).unwrap();
        let mut g2 = ValueGenerator::for_field("t", &field, &empty_pool(), 99).unwrap();
        let s1: Vec<String> = (0..50).map(|_| g1.generate()).collect();
        let s2: Vec<String> = (0..50).map(|_| g2.generate()).collect();
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_field_seed_depends_on_position_and_table() {
        assert_eq!(field_seed(1, "person", 0), field_seed(1, "person", 0));
        assert_ne!(field_seed(1, "person", 0), field_seed(1, "person", 1));
        assert_ne!(field_seed(1, "person", 0), field_seed(1, "visit", 0));
        assert_ne!(field_seed(1, "person", 0), field_seed(2, "person", 0));
    }
}
