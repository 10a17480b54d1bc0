//! Error types for lookups.

use std::path::PathBuf;
use thiserror::Error;

/// Every way a lookup can fail. None of the messages carry the master secret.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Wrong password for KeePass file")]
    Authentication,

    #[error("Could not open KeePass file {}: {reason}", path.display())]
    Connection { path: PathBuf, reason: String },

    #[error("KeePass file {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Could not find any matching entry for '{term}'")]
    NotFound { term: String },

    #[error("Malformed database tree: {0}")]
    Integrity(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl LookupError {
    /// Short, stable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Connection { .. } => "connection",
            Self::Corrupt { .. } => "corrupt-file",
            Self::NotFound { .. } => "not-found",
            Self::Integrity(_) => "integrity",
            Self::Configuration(_) | Self::InvalidPattern { .. } => "configuration",
        }
    }
}

pub type Result<T> = std::result::Result<T, LookupError>;
