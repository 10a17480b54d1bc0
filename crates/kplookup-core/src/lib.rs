//! Entry lookup for KeePass databases.
//!
//! Opens a database, finds the entries addressed by each lookup term and
//! turns them into flat [`Record`]s for automation tools.

pub mod attachments;
pub mod config;
pub mod database;
pub mod error;
pub mod lookup;
pub mod matcher;
pub mod models;
pub mod resolver;
pub mod serializer;

pub use attachments::AttachmentIndex;
pub use config::{default_kdbx_file, LookupConfig, Secret};
pub use database::KeepassDatabase;
pub use error::{LookupError, Result};
pub use lookup::{lookup, lookup_in};
pub use matcher::{match_entries, MatchMode, RegexMode};
pub use models::{Attachment, Entry, EntryId, Group, GroupId, Tree};
pub use resolver::resolve_groups;
pub use serializer::{EntryField, Record, Serializer};
