//! # Configuration Module
//!
//! Data directory setup and runtime configuration for Micdrop. The
//! database lives in the platform-standard data directory:
//! - Linux: `~/.local/share/micdrop/`
//! - macOS: `~/Library/Application Support/micdrop/`
//! - Windows: `%APPDATA%\micdrop\`
//!
//! `MICDROP_DB` overrides the location, which the test suite and the
//! `--database` flag rely on.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Returns the platform-appropriate database file path, creating the
/// `micdrop` data subdirectory if needed.
///
/// # Errors
///
/// Fails when the system data directory cannot be determined or the
/// subdirectory cannot be created.
pub fn get_db_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!("Could not determine system data directory for this platform.")
    })?;

    let micdrop_dir = data_dir.join("micdrop");
    fs::create_dir_all(&micdrop_dir).with_context(|| {
        format!(
            "Failed to create Micdrop data directory at {}. Please check file permissions.",
            micdrop_dir.display()
        )
    })?;

    Ok(micdrop_dir.join("karaoke.db"))
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Path to the database file
    pub db_path: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            db_path: get_db_path().unwrap_or_else(|_| PathBuf::from("karaoke.db")),
        }
    }
}

impl RuntimeConfig {
    /// Resolve configuration: an explicit path wins over the platform
    /// default.
    pub fn resolve(db_override: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_override {
            Some(path) => path,
            None => get_db_path()?,
        };
        Ok(Self { db_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_db_path_returns_valid_path() {
        let path = get_db_path().expect("Should get valid path");
        assert_eq!(path.file_name().unwrap(), "karaoke.db");
        assert!(path.is_absolute(), "Database path should be absolute");

        let parent = path.parent().expect("Should have parent directory");
        assert_eq!(parent.file_name().unwrap(), "micdrop");
        assert!(parent.is_dir());
    }

    #[test]
    fn test_get_db_path_consistent_results() {
        let path1 = get_db_path().expect("First call should succeed");
        let path2 = get_db_path().expect("Second call should succeed");
        assert_eq!(path1, path2);
    }

    #[test]
    fn test_explicit_path_wins() {
        let config = RuntimeConfig::resolve(Some(PathBuf::from("/tmp/other.db")))
            .expect("Should resolve");
        assert_eq!(config.db_path, PathBuf::from("/tmp/other.db"));
    }
}
