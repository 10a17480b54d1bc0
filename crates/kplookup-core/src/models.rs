//! Read-only group/entry tree loaded from a KeePass database.
//!
//! Groups and entries live in a single arena owned by [`Tree`] and refer to
//! each other through [`GroupId`] / [`EntryId`] indices, which gives every
//! group a parent link without shared ownership.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// Index of a group inside a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(usize);

/// Index of an entry (live or history snapshot) inside a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(usize);

/// Represents a group (folder) in the database tree.
#[derive(Debug, Clone)]
pub struct Group {
    pub uuid: String,
    pub name: String,
    pub parent: Option<GroupId>,
    pub groups: Vec<GroupId>,
    pub entries: Vec<EntryId>,
}

/// Entry timestamps as stored in the database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Times {
    pub creation: Option<NaiveDateTime>,
    pub last_modification: Option<NaiveDateTime>,
    pub last_access: Option<NaiveDateTime>,
    pub expiry: Option<NaiveDateTime>,
    pub expires: bool,
}

/// Auto-type settings of an entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoType {
    pub enabled: bool,
    pub sequence: Option<String>,
}

/// A binary attachment. Only its name is kept; content stays in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
}

/// Represents a password entry, either live or a history snapshot.
#[derive(Debug, Clone, Default)]
pub struct Entry {
    pub uuid: String,
    pub title: String,
    pub username: String,
    pub password: String,
    pub url: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub icon: Option<usize>,
    pub times: Times,
    pub autotype: AutoType,
    pub otp: Option<String>,
    pub custom_fields: BTreeMap<String, String>,
    pub attachments: Vec<Attachment>,
    /// Set by [`Tree::add_entry`] / [`Tree::add_history`].
    pub group: Option<GroupId>,
    pub history: Vec<EntryId>,
    pub is_history: bool,
}

impl Entry {
    /// Create an entry with the given title and no other fields.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_attachment(mut self, filename: impl Into<String>) -> Self {
        self.attachments.push(Attachment {
            filename: filename.into(),
        });
        self
    }
}

/// The whole group/entry tree of one opened database.
#[derive(Debug, Clone)]
pub struct Tree {
    groups: Vec<Group>,
    entries: Vec<Entry>,
}

impl Tree {
    /// Create a tree holding only a root group with the given name.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            groups: vec![Group {
                uuid: String::new(),
                name: root_name.into(),
                parent: None,
                groups: Vec::new(),
                entries: Vec::new(),
            }],
            entries: Vec::new(),
        }
    }

    pub fn root(&self) -> GroupId {
        GroupId(0)
    }

    pub fn group(&self, id: GroupId) -> &Group {
        &self.groups[id.0]
    }

    pub fn entry(&self, id: EntryId) -> &Entry {
        &self.entries[id.0]
    }

    pub(crate) fn group_mut(&mut self, id: GroupId) -> &mut Group {
        &mut self.groups[id.0]
    }

    #[cfg(test)]
    pub(crate) fn entry_mut(&mut self, id: EntryId) -> &mut Entry {
        &mut self.entries[id.0]
    }

    /// Append a child group under `parent`.
    pub fn add_group(&mut self, parent: GroupId, name: impl Into<String>) -> GroupId {
        let id = GroupId(self.groups.len());
        self.groups.push(Group {
            uuid: String::new(),
            name: name.into(),
            parent: Some(parent),
            groups: Vec::new(),
            entries: Vec::new(),
        });
        self.groups[parent.0].groups.push(id);
        id
    }

    /// Append a live entry to `group`.
    pub fn add_entry(&mut self, group: GroupId, mut entry: Entry) -> EntryId {
        let id = EntryId(self.entries.len());
        entry.group = Some(group);
        entry.is_history = false;
        self.entries.push(entry);
        self.groups[group.0].entries.push(id);
        id
    }

    /// Record `snapshot` as a prior version of `owner`.
    ///
    /// The snapshot shares the owner's group but is not listed among the
    /// group's entries, so it is only reachable through `owner.history`.
    pub fn add_history(&mut self, owner: EntryId, mut snapshot: Entry) -> EntryId {
        let id = EntryId(self.entries.len());
        snapshot.group = self.entries[owner.0].group;
        snapshot.is_history = true;
        self.entries.push(snapshot);
        self.entries[owner.0].history.push(id);
        id
    }

    /// Slash-delimited path of a group. The root group's path is `/`.
    pub fn group_path(&self, id: GroupId) -> String {
        let mut names = Vec::new();
        let mut current = id;
        while let Some(parent) = self.group(current).parent {
            names.push(self.group(current).name.as_str());
            current = parent;
        }
        if names.is_empty() {
            return "/".to_string();
        }
        names.reverse();
        names.join("/")
    }

    /// Path of an entry: its group's path followed by its title.
    pub fn entry_path(&self, id: EntryId) -> String {
        let entry = self.entry(id);
        match entry.group {
            Some(group) if group != self.root() => {
                format!("{}/{}", self.group_path(group), entry.title)
            }
            _ => entry.title.clone(),
        }
    }

    /// All live entries in traversal order: a group's own entries first,
    /// then each child group depth-first.
    pub fn entries_in_order(&self) -> Vec<EntryId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let group = self.group(id);
            out.extend(group.entries.iter().copied());
            stack.extend(group.groups.iter().rev().copied());
        }
        out
    }

    /// Number of groups, root included.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_built_from_parent_links() {
        let mut tree = Tree::new("Root");
        let a = tree.add_group(tree.root(), "A");
        let b = tree.add_group(a, "B");
        let top = tree.add_entry(tree.root(), Entry::new("top"));
        let deep = tree.add_entry(b, Entry::new("deep"));

        assert_eq!(tree.group_path(tree.root()), "/");
        assert_eq!(tree.group_path(a), "A");
        assert_eq!(tree.group_path(b), "A/B");
        assert_eq!(tree.entry_path(top), "top");
        assert_eq!(tree.entry_path(deep), "A/B/deep");
    }

    #[test]
    fn traversal_visits_entries_before_subgroups() {
        let mut tree = Tree::new("Root");
        let a = tree.add_group(tree.root(), "A");
        let b = tree.add_group(tree.root(), "B");
        let in_b = tree.add_entry(b, Entry::new("in_b"));
        let in_a = tree.add_entry(a, Entry::new("in_a"));
        let top = tree.add_entry(tree.root(), Entry::new("top"));

        assert_eq!(tree.entries_in_order(), vec![top, in_a, in_b]);
    }

    #[test]
    fn history_snapshots_are_not_listed_in_groups() {
        let mut tree = Tree::new("Root");
        let live = tree.add_entry(tree.root(), Entry::new("e"));
        let old = tree.add_history(live, Entry::new("e-old"));

        assert_eq!(tree.entries_in_order(), vec![live]);
        assert_eq!(tree.entry(live).history, vec![old]);
        assert!(tree.entry(old).is_history);
        assert_eq!(tree.entry(old).group, Some(tree.root()));
    }
}
