//! Reading scan profiles from disk.
//!
//! The profile document is plain JSON (see `DatabaseProfile`). Whatever
//! parses the scanner's spreadsheet output writes this format; ScanSeed only
//! reads it.

use std::path::Path;

use super::DatabaseProfile;
use crate::error::{Result, ScanSeedError};

/// Load and validate a profile document.
pub fn load_profile(path: &Path) -> Result<DatabaseProfile> {
    let content = std::fs::read_to_string(path).map_err(|e| ScanSeedError::ProfileLoad {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    parse_profile(&content).map_err(|e| match e {
        ScanSeedError::ProfileLoad { message, .. } => ScanSeedError::ProfileLoad {
            path: path.display().to_string(),
            message,
        },
        other => other,
    })
}

/// Parse a profile document already in memory.
pub fn parse_profile(content: &str) -> Result<DatabaseProfile> {
    let profile: DatabaseProfile =
        serde_json::from_str(content).map_err(|e| ScanSeedError::ProfileLoad {
            path: "<memory>".to_string(),
            message: e.to_string(),
        })?;
    profile.validate()?;
    Ok(profile)
}
