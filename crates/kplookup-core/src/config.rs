//! Per-call lookup configuration.

use crate::error::{LookupError, Result};
use crate::matcher::{MatchMode, RegexMode};
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroizing;

/// The database master password. Wiped on drop and never printed.
#[derive(Clone)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Options for one lookup invocation.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Path to the KeePass database file.
    pub kdbx_file: PathBuf,
    /// Master password for the database.
    pub kdbx_password: Secret,
    /// Whether records include the `password` attribute.
    pub include_password: bool,
    /// Treat terms as patterns instead of exact entry paths.
    pub regex: bool,
    /// Pattern flavour used when `regex` is set.
    pub regex_mode: RegexMode,
}

impl LookupConfig {
    /// Config with default options for the given file and password.
    pub fn new(kdbx_file: impl Into<PathBuf>, kdbx_password: Secret) -> Self {
        Self {
            kdbx_file: kdbx_file.into(),
            kdbx_password,
            include_password: false,
            regex: false,
            regex_mode: RegexMode::default(),
        }
    }

    pub fn match_mode(&self) -> MatchMode {
        MatchMode::new(self.regex, self.regex_mode)
    }

    pub fn validate(&self) -> Result<()> {
        if self.kdbx_file.as_os_str().is_empty() {
            return Err(LookupError::Configuration(
                "no KeePass file path given".to_string(),
            ));
        }
        Ok(())
    }
}

/// `~/Passwords.kdbx`, used when no file is configured.
pub fn default_kdbx_file() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join("Passwords.kdbx"))
        .ok_or_else(|| {
            LookupError::Configuration(
                "no KeePass file given and the home directory is unknown".to_string(),
            )
        })
}
