//! KeePass database access, converted into a read-only [`Tree`].

use crate::attachments::AttachmentIndex;
use crate::error::{LookupError, Result};
use crate::models::{Attachment, AutoType, Entry, EntryId, GroupId, Times, Tree};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use keepass::error::DatabaseOpenError;
use keepass::{Database, DatabaseKey};
use std::collections::BTreeMap;
use std::path::Path;

/// Standard fields that have their own slot in [`Entry`].
const STANDARD_FIELDS: &[&str] = &["Title", "UserName", "Password", "URL", "Notes", "otp"];

/// An unlocked KeePass database, held only for one lookup.
pub struct KeepassDatabase {
    tree: Tree,
}

impl KeepassDatabase {
    /// Open and unlock a KeePass database.
    ///
    /// The file is read into memory and closed before decrypting. The XML
    /// payload is decrypted a second time to recover attachment names.
    pub fn unlock(path: impl AsRef<Path>, password: &str) -> Result<Self> {
        let path = path.as_ref();

        let data = std::fs::read(path).map_err(|e| LookupError::Connection {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let key = DatabaseKey::new().with_password(password);
        let db = Database::open(&mut data.as_slice(), key.clone())
            .map_err(|e| open_error(path, e))?;
        let xml = Database::get_xml(&mut data.as_slice(), key).map_err(|e| open_error(path, e))?;
        let attachments = AttachmentIndex::from_xml(&xml).map_err(|e| LookupError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("unreadable XML payload: {e}"),
        })?;

        let tree = convert_database(&db, &attachments);
        tracing::info!(
            "Opened {} ({} groups)",
            path.display(),
            tree.group_count()
        );

        Ok(Self { tree })
    }

    /// The group/entry tree of the database.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }
}

/// Classify an open failure. The keepass error text never includes the key.
fn open_error(path: &Path, err: DatabaseOpenError) -> LookupError {
    match err {
        DatabaseOpenError::Key(_) => LookupError::Authentication,
        DatabaseOpenError::Io(e) => LookupError::Connection {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
        other => LookupError::Corrupt {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

/// Build a [`Tree`] from an opened database.
///
/// `attachments` supplies the entry attachment names the keepass crate does
/// not keep.
pub fn convert_database(db: &Database, attachments: &AttachmentIndex) -> Tree {
    let mut tree = Tree::new(db.root.name.clone());
    let root = tree.root();
    tree.group_mut(root).uuid = db.root.uuid.to_string();
    convert_children(&mut tree, root, &db.root, attachments);
    tree
}

fn convert_children(
    tree: &mut Tree,
    parent: GroupId,
    kg: &keepass::db::Group,
    attachments: &AttachmentIndex,
) {
    for node in &kg.children {
        match node {
            keepass::db::Node::Entry(ke) => {
                let id = tree.add_entry(parent, convert_entry(ke, attachments, None));
                convert_history(tree, id, ke, attachments);
            }
            keepass::db::Node::Group(g) => {
                let child = tree.add_group(parent, g.name.clone());
                tree.group_mut(child).uuid = g.uuid.to_string();
                convert_children(tree, child, g, attachments);
            }
        }
    }
}

fn convert_history(
    tree: &mut Tree,
    owner: EntryId,
    ke: &keepass::db::Entry,
    attachments: &AttachmentIndex,
) {
    let Some(history) = &ke.history else {
        return;
    };
    for (revision, snapshot) in history.get_entries().iter().enumerate() {
        // Snapshots carry no history of their own in KDBX.
        tree.add_history(owner, convert_entry(snapshot, attachments, Some(revision)));
    }
}

/// Convert a keepass::Entry (or its `revision`-th snapshot) to our Entry model.
fn convert_entry(
    ke: &keepass::db::Entry,
    index: &AttachmentIndex,
    revision: Option<usize>,
) -> Entry {
    let mut custom_fields = BTreeMap::new();
    let mut inline = Vec::new();

    for (key, val) in &ke.fields {
        if STANDARD_FIELDS.contains(&key.as_str()) {
            continue;
        }

        match val {
            keepass::db::Value::Bytes(_) => inline.push(key.clone()),
            keepass::db::Value::Unprotected(s) => {
                custom_fields.insert(key.clone(), s.clone());
            }
            _ => {
                if let Some(s) = ke.get(key) {
                    custom_fields.insert(key.clone(), s.to_string());
                } else {
                    tracing::warn!("Skipping unreadable field on entry {}", ke.uuid);
                }
            }
        }
    }
    // HashMap iteration order is arbitrary.
    inline.sort();

    let xml_uuid = STANDARD.encode(ke.uuid.as_bytes());
    let mut attachments: Vec<Attachment> = index
        .names(&xml_uuid, revision)
        .iter()
        .map(|filename| Attachment {
            filename: filename.clone(),
        })
        .collect();
    for filename in inline {
        if !attachments.iter().any(|a| a.filename == filename) {
            attachments.push(Attachment { filename });
        }
    }

    Entry {
        uuid: ke.uuid.to_string(),
        title: ke.get_title().unwrap_or_default().to_string(),
        username: ke.get_username().unwrap_or_default().to_string(),
        password: ke.get_password().unwrap_or_default().to_string(),
        url: ke.get_url().unwrap_or_default().to_string(),
        notes: ke.get("Notes").unwrap_or_default().to_string(),
        tags: ke.tags.clone(),
        icon: ke.icon_id,
        times: Times {
            creation: ke.times.get_creation().copied(),
            last_modification: ke.times.get_last_modification().copied(),
            last_access: ke.times.get_last_access().copied(),
            expiry: ke.times.get_expiry().copied(),
            expires: ke.times.expires,
        },
        autotype: ke
            .autotype
            .as_ref()
            .map(|at| AutoType {
                enabled: at.enabled,
                sequence: at.sequence.clone(),
            })
            .unwrap_or_default(),
        otp: ke.get_raw_otp_value().map(|s| s.to_string()),
        custom_fields,
        attachments,
        ..Entry::default()
    }
}
