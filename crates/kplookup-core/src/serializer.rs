//! Conversion of entries into flat records.
//!
//! The set of emitted attributes is fixed by [`EntryField`]; nothing is
//! discovered at runtime.

use crate::error::{LookupError, Result};
use crate::models::{EntryId, Tree};
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Version of the [`EntryField`] list. Bump when fields are added or renamed.
pub const SCHEMA_VERSION: u32 = 1;

/// Upper bound on nested history levels. KDBX stores a single level.
pub const MAX_HISTORY_DEPTH: usize = 8;

/// Plain entry attributes emitted in every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryField {
    Atime,
    AutotypeEnabled,
    AutotypeSequence,
    Ctime,
    CustomProperties,
    Expired,
    Expires,
    ExpiryTime,
    Icon,
    IsAHistoryEntry,
    Mtime,
    Notes,
    Otp,
    Password,
    Path,
    Tags,
    Title,
    Url,
    Username,
    Uuid,
}

impl EntryField {
    pub const ALL: [EntryField; 20] = [
        Self::Atime,
        Self::AutotypeEnabled,
        Self::AutotypeSequence,
        Self::Ctime,
        Self::CustomProperties,
        Self::Expired,
        Self::Expires,
        Self::ExpiryTime,
        Self::Icon,
        Self::IsAHistoryEntry,
        Self::Mtime,
        Self::Notes,
        Self::Otp,
        Self::Password,
        Self::Path,
        Self::Tags,
        Self::Title,
        Self::Url,
        Self::Username,
        Self::Uuid,
    ];

    /// Attribute name in the record.
    pub fn name(self) -> &'static str {
        match self {
            Self::Atime => "atime",
            Self::AutotypeEnabled => "autotype_enabled",
            Self::AutotypeSequence => "autotype_sequence",
            Self::Ctime => "ctime",
            Self::CustomProperties => "custom_properties",
            Self::Expired => "expired",
            Self::Expires => "expires",
            Self::ExpiryTime => "expiry_time",
            Self::Icon => "icon",
            Self::IsAHistoryEntry => "is_a_history_entry",
            Self::Mtime => "mtime",
            Self::Notes => "notes",
            Self::Otp => "otp",
            Self::Password => "password",
            Self::Path => "path",
            Self::Tags => "tags",
            Self::Title => "title",
            Self::Url => "url",
            Self::Username => "username",
            Self::Uuid => "uuid",
        }
    }
}

/// A raw attribute value before it is rendered into JSON.
#[derive(Debug, Clone, PartialEq)]
enum AttrValue {
    Text(String),
    Bool(bool),
    Map(BTreeMap<String, String>),
    List(Vec<String>),
    Time(NaiveDateTime),
    Count(usize),
}

impl AttrValue {
    /// Text, booleans, maps and lists pass through. Anything else becomes
    /// its text form, and a missing value becomes empty text.
    fn render(value: Option<AttrValue>) -> Value {
        match value {
            None => Value::String(String::new()),
            Some(Self::Text(s)) => Value::String(s),
            Some(Self::Bool(b)) => Value::Bool(b),
            Some(Self::Map(m)) => Value::Object(
                m.into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            ),
            Some(Self::List(l)) => Value::Array(l.into_iter().map(Value::String).collect()),
            Some(Self::Time(t)) => Value::String(t.to_string()),
            Some(Self::Count(n)) => Value::String(n.to_string()),
        }
    }
}

/// Flat attribute mapping for one entry. Keys are kept sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }
}

/// Serializes entries of one tree with fixed options.
#[derive(Debug, Clone)]
pub struct Serializer<'a> {
    tree: &'a Tree,
    include_password: bool,
    now: NaiveDateTime,
}

impl<'a> Serializer<'a> {
    pub fn new(tree: &'a Tree, include_password: bool) -> Self {
        Self {
            tree,
            include_password,
            now: chrono::Utc::now().naive_utc(),
        }
    }

    /// Use `now` when deciding whether an entry has expired.
    pub fn at(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    /// Convert `entry` and its history into a [`Record`].
    pub fn serialize(&self, entry: EntryId) -> Result<Record> {
        let mut chain = Vec::new();
        self.serialize_inner(entry, &mut chain)
    }

    fn serialize_inner(&self, id: EntryId, chain: &mut Vec<EntryId>) -> Result<Record> {
        if chain.contains(&id) {
            return Err(LookupError::Integrity(format!(
                "history of '{}' refers back to itself",
                self.tree.entry_path(id)
            )));
        }
        if chain.len() > MAX_HISTORY_DEPTH {
            return Err(LookupError::Integrity(format!(
                "history of '{}' is nested deeper than {} levels",
                self.tree.entry_path(id),
                MAX_HISTORY_DEPTH
            )));
        }

        let entry = self.tree.entry(id);
        let group = entry.group.ok_or_else(|| {
            LookupError::Integrity(format!("entry '{}' has no group", entry.title))
        })?;

        let mut record = Record::default();
        for field in EntryField::ALL {
            if field == EntryField::Password && !self.include_password {
                continue;
            }
            record.insert(field.name(), AttrValue::render(self.field(id, field)));
        }

        record.insert(
            "attachments",
            Value::Array(
                entry
                    .attachments
                    .iter()
                    .map(|a| Value::String(a.filename.clone()))
                    .collect(),
            ),
        );
        record.insert("group", Value::String(self.tree.group_path(group)));
        let parentgroup = self
            .tree
            .group(group)
            .parent
            .map(|p| self.tree.group_path(p))
            .unwrap_or_default();
        record.insert("parentgroup", Value::String(parentgroup));

        chain.push(id);
        let mut history = Vec::with_capacity(entry.history.len());
        for snapshot in &entry.history {
            let rec = self.serialize_inner(*snapshot, chain)?;
            history.push(Value::Object(rec.0.into_iter().collect()));
        }
        chain.pop();
        record.insert("history", Value::Array(history));

        Ok(record)
    }

    fn field(&self, id: EntryId, field: EntryField) -> Option<AttrValue> {
        let entry = self.tree.entry(id);
        let text = |s: &str| Some(AttrValue::Text(s.to_string()));
        match field {
            EntryField::Atime => entry.times.last_access.map(AttrValue::Time),
            EntryField::AutotypeEnabled => Some(AttrValue::Bool(entry.autotype.enabled)),
            EntryField::AutotypeSequence => entry.autotype.sequence.clone().map(AttrValue::Text),
            EntryField::Ctime => entry.times.creation.map(AttrValue::Time),
            EntryField::CustomProperties => Some(AttrValue::Map(entry.custom_fields.clone())),
            EntryField::Expired => Some(AttrValue::Bool(
                entry.times.expires && entry.times.expiry.is_some_and(|t| t <= self.now),
            )),
            EntryField::Expires => Some(AttrValue::Bool(entry.times.expires)),
            EntryField::ExpiryTime => entry.times.expiry.map(AttrValue::Time),
            EntryField::Icon => entry.icon.map(AttrValue::Count),
            EntryField::IsAHistoryEntry => Some(AttrValue::Bool(entry.is_history)),
            EntryField::Mtime => entry.times.last_modification.map(AttrValue::Time),
            EntryField::Notes => text(&entry.notes),
            EntryField::Otp => entry.otp.clone().map(AttrValue::Text),
            EntryField::Password => text(&entry.password),
            EntryField::Path => Some(AttrValue::Text(self.tree.entry_path(id))),
            EntryField::Tags => Some(AttrValue::List(entry.tags.clone())),
            EntryField::Title => text(&entry.title),
            EntryField::Url => text(&entry.url),
            EntryField::Username => text(&entry.username),
            EntryField::Uuid => text(&entry.uuid),
        }
    }
}
