//! Configuration file handling.
//!
//! Reads from `~/.config/kplookup/kplookup.toml`. The master password is
//! never read from or written to this file.

use anyhow::{Context, Result};
use kplookup_core::RegexMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Defaults applied when a flag or environment variable is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the KeePass database file.
    pub kdbx_file: Option<PathBuf>,
    /// Whether records include the password attribute.
    pub include_password: bool,
    /// Treat terms as patterns.
    pub regex: bool,
    /// Pattern flavour: "global" or "legacy".
    pub regex_mode: RegexMode,
}

impl Config {
    /// Load configuration from the config file.
    ///
    /// If `custom_path` is provided, the file must exist. A missing default
    /// file just means built-in defaults.
    pub fn load(custom_path: Option<&Path>) -> Result<Self> {
        let config_path = match custom_path {
            Some(path) => path.to_path_buf(),
            None => match Self::config_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if !config_path.exists() {
            if custom_path.is_some() {
                anyhow::bail!("Config file not found: {}", config_path.display());
            }
            tracing::debug!("No config file at {}", config_path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        tracing::info!("Loaded config from {}: {:?}", config_path.display(), config);
        Ok(config)
    }

    fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Get the path to the default config file.
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kplookup").join("kplookup.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn parses_all_keys() {
        let config = Config::parse(
            r#"
            kdbx_file = "/srv/secrets.kdbx"
            include_password = true
            regex = true
            regex_mode = "legacy"
            "#,
        )
        .unwrap();
        assert_eq!(config.kdbx_file, Some(PathBuf::from("/srv/secrets.kdbx")));
        assert!(config.include_password);
        assert!(config.regex);
        assert_eq!(config.regex_mode, RegexMode::Legacy);
    }

    #[test]
    fn unknown_regex_mode_is_rejected() {
        assert!(Config::parse(r#"regex_mode = "fuzzy""#).is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
