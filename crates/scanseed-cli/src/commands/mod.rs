pub mod generate;
pub mod inspect;
pub mod preview;

use std::path::Path;

use anyhow::{Context, Result};

use scanseed_core::config::ScanSeedConfig;
use scanseed_core::generate::engine::GenerationOptions;
use scanseed_core::generate::key_pool::KeyMatching;
use scanseed_core::profile::load::load_profile;
use scanseed_core::DatabaseProfile;

/// Flags that override `scanseed.toml` for a single run.
#[derive(Debug, Default)]
pub struct OptionOverrides {
    pub rows: Option<usize>,
    pub seed: Option<u64>,
    pub concurrency: Option<usize>,
    pub qualified_keys: bool,
}

/// Load the profile and report config entries that don't match it.
pub fn read_profile(path: &Path, config: Option<&ScanSeedConfig>) -> Result<DatabaseProfile> {
    let profile = load_profile(path)
        .with_context(|| format!("Failed to load scan profile {}", path.display()))?;

    if let Some(cfg) = config {
        for warning in cfg.validate_against_profile(&profile) {
            eprintln!("Warning: {}", warning);
        }
    }
    Ok(profile)
}

/// Engine options: CLI flag > scanseed.toml > default.
pub fn resolve_options(config: Option<&ScanSeedConfig>, overrides: &OptionOverrides) -> GenerationOptions {
    let mut options = config
        .map(ScanSeedConfig::generation_options)
        .unwrap_or_default();

    if let Some(rows) = overrides.rows {
        options.row_ceiling = rows;
    }
    if let Some(seed) = overrides.seed {
        options.seed = seed;
    }
    if let Some(concurrency) = overrides.concurrency {
        options.concurrency = concurrency;
    }
    if overrides.qualified_keys && options.key_matching == KeyMatching::FieldName {
        let links = config.map(|c| c.keys.links.clone()).unwrap_or_default();
        options.key_matching = KeyMatching::Qualified(links);
    }
    options
}

/// Shorten a value for terminal display, respecting char boundaries.
pub fn display_value(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let kept: String = value.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_override_config() {
        let config = toml_config("[generate]\nrows = 500\nseed = 9\n");
        let options = resolve_options(
            Some(&config),
            &OptionOverrides {
                rows: Some(20),
                ..OptionOverrides::default()
            },
        );
        assert_eq!(options.row_ceiling, 20);
        assert_eq!(options.seed, 9);
    }

    #[test]
    fn test_defaults_without_config() {
        let options = resolve_options(None, &OptionOverrides::default());
        assert_eq!(options, GenerationOptions::default());
    }

    #[test]
    fn test_qualified_flag_uses_config_links() {
        let config = toml_config("[keys.links]\n\"visit.person_id\" = [\"person.person_id\"]\n");
        let options = resolve_options(
            Some(&config),
            &OptionOverrides {
                qualified_keys: true,
                ..OptionOverrides::default()
            },
        );
        match options.key_matching {
            KeyMatching::Qualified(links) => assert_eq!(links.len(), 1),
            other => panic!("expected qualified matching, got {:?}", other),
        }
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value("short", 40), "short");
        assert_eq!(display_value(&"é".repeat(50), 10), format!("{}...", "é".repeat(7)));
    }

    fn toml_config(raw: &str) -> ScanSeedConfig {
        scanseed_core::config::parse_config(raw).unwrap()
    }
}
