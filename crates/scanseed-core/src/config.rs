//! # Configuration File Parser
//!
//! Reads and parses `scanseed.toml`, the optional configuration file that sets
//! run defaults without CLI flags. Supports:
//!
//! - `[database]`: default connection URL
//! - `[generate]`: row ceiling, seed, concurrency, batch size
//! - `[keys]`: how truncated key fields find donor values
//! - `[retry]`: per-call timeout and retry budget for the target database
//!
//! Example `scanseed.toml`:
//!
//! ```toml
//! [database]
//! url = "postgres://localhost/fake_cdm"
//!
//! [generate]
//! rows = 1000
//! seed = 42
//! concurrency = 4
//! batch_size = 1000
//!
//! [keys]
//! matching = "qualified"
//!
//! [keys.links]
//! "visit_occurrence.person_id" = ["person.person_id"]
//!
//! [retry]
//! max_retries = 3
//! base_delay_ms = 200
//! timeout_secs = 30
//! ```
//!
//! Values given on the command line win over the file; anything left unset
//! falls back to the built-in defaults.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, ScanSeedError};
use crate::generate::engine::GenerationOptions;
use crate::generate::key_pool::KeyMatching;
use crate::output::retry::RetryPolicy;
use crate::profile::DatabaseProfile;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "scanseed.toml";

/// Top-level scanseed.toml structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScanSeedConfig {
    pub database: DatabaseConfig,
    pub generate: GenerateConfig,
    pub keys: KeysConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Target database URL (e.g., "postgres://localhost/fake_cdm").
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Row ceiling per table.
    pub rows: Option<usize>,
    pub seed: Option<u64>,
    /// Tables generated at the same time.
    pub concurrency: Option<usize>,
    /// Rows generated between cancellation checks.
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchingMode {
    #[default]
    FieldName,
    Qualified,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub matching: MatchingMode,
    /// "table.field" of a truncated field → donor "table.field" entries.
    pub links: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

/// Read and parse a scanseed.toml file from the given directory.
///
/// Returns `None` if the file doesn't exist (config is optional).
/// Returns an error if the file exists but can't be parsed or fails validation.
pub fn read_config(dir: &Path) -> Result<Option<ScanSeedConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| ScanSeedError::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    match parse_config(&content) {
        Ok(config) => Ok(Some(config)),
        Err(ScanSeedError::Config { message }) => Err(ScanSeedError::Config {
            message: format!("{}: {}", path.display(), message),
        }),
        Err(e) => Err(e),
    }
}

/// Parse and validate scanseed.toml content.
pub fn parse_config(content: &str) -> Result<ScanSeedConfig> {
    let config: ScanSeedConfig = toml::from_str(content).map_err(|e| ScanSeedError::Config {
        message: format!("Failed to parse config: {}", e),
    })?;
    config.validate()?;
    Ok(config)
}

impl ScanSeedConfig {
    /// Validate constraints serde cannot enforce.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("generate.rows", self.generate.rows),
            ("generate.concurrency", self.generate.concurrency),
            ("generate.batch_size", self.generate.batch_size),
        ];
        for (key, value) in positive {
            if value == Some(0) {
                return Err(ScanSeedError::Config {
                    message: format!("{} must be greater than 0", key),
                });
            }
        }
        if self.retry.timeout_secs == Some(0) {
            return Err(ScanSeedError::Config {
                message: "retry.timeout_secs must be greater than 0".to_string(),
            });
        }

        for (key, donors) in &self.keys.links {
            for entry in std::iter::once(key).chain(donors) {
                if !is_qualified_name(entry) {
                    return Err(ScanSeedError::Config {
                        message: format!(
                            "keys.links entry '{}' is not in 'table.field' format",
                            entry
                        ),
                    });
                }
            }
        }
        if self.keys.matching == MatchingMode::FieldName && !self.keys.links.is_empty() {
            tracing::warn!(
                "scanseed.toml: [keys.links] only applies with qualified key matching"
            );
        }
        Ok(())
    }

    pub fn key_matching(&self) -> KeyMatching {
        match self.keys.matching {
            MatchingMode::FieldName => KeyMatching::FieldName,
            MatchingMode::Qualified => KeyMatching::Qualified(self.keys.links.clone()),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_retries: self.retry.max_retries.unwrap_or(defaults.max_retries),
            base_delay: self
                .retry
                .base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
            timeout: self
                .retry
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Engine options from this file, with defaults for anything unset.
    pub fn generation_options(&self) -> GenerationOptions {
        let defaults = GenerationOptions::default();
        GenerationOptions {
            row_ceiling: self.generate.rows.unwrap_or(defaults.row_ceiling),
            seed: self.generate.seed.unwrap_or(defaults.seed),
            concurrency: self.generate.concurrency.unwrap_or(defaults.concurrency),
            batch_size: self.generate.batch_size.unwrap_or(defaults.batch_size),
            key_matching: self.key_matching(),
            retry: self.retry_policy(),
        }
    }

    /// Check `[keys.links]` against a loaded profile.
    ///
    /// Returns one warning per link naming a table or field the profile does
    /// not have, so stale config entries show up before a run.
    pub fn validate_against_profile(&self, profile: &DatabaseProfile) -> Vec<String> {
        let mut warnings = Vec::new();
        for (key, donors) in &self.keys.links {
            for entry in std::iter::once(key).chain(donors) {
                let Some((table, field)) = entry.split_once('.') else {
                    continue;
                };
                match profile.table(table) {
                    Some(t) if t.field(field).is_none() => warnings.push(format!(
                        "scanseed.toml: [keys.links] references field '{}' which does not exist in table '{}'",
                        field, table
                    )),
                    None => warnings.push(format!(
                        "scanseed.toml: [keys.links] references table '{}' which does not exist in the profile",
                        table
                    )),
                    Some(_) => {}
                }
            }
        }
        warnings
    }
}

fn is_qualified_name(entry: &str) -> bool {
    entry
        .split_once('.')
        .is_some_and(|(table, field)| !table.is_empty() && !field.is_empty())
}
