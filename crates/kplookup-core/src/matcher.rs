//! Entry matching for lookup terms.

use crate::error::{LookupError, Result};
use crate::models::{EntryId, Tree};
use crate::resolver::{full_match, resolve_groups};
use serde::{Deserialize, Serialize};

/// How a term is interpreted when regex lookups are enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegexMode {
    /// The whole term is matched against every entry path.
    #[default]
    Global,
    /// `group/path/title`: groups resolved segment by segment, then the
    /// title matched inside each of them.
    Legacy,
}

/// Addressing mode for a single lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    Regex(RegexMode),
}

impl MatchMode {
    pub fn new(regex: bool, regex_mode: RegexMode) -> Self {
        if regex {
            Self::Regex(regex_mode)
        } else {
            Self::Exact
        }
    }
}

/// Find the entries addressed by `term`. Zero matches is an error.
pub fn match_entries(tree: &Tree, term: &str, mode: MatchMode) -> Result<Vec<EntryId>> {
    let found = match mode {
        MatchMode::Exact => find_exact(tree, term).into_iter().collect(),
        MatchMode::Regex(RegexMode::Global) => find_global(tree, term)?,
        MatchMode::Regex(RegexMode::Legacy) => find_by_group_and_title(tree, term)?,
    };

    tracing::debug!("Term '{}' matched {} entries", term, found.len());

    if found.is_empty() {
        return Err(LookupError::NotFound {
            term: term.to_string(),
        });
    }
    Ok(found)
}

fn find_exact(tree: &Tree, term: &str) -> Option<EntryId> {
    let term = term.strip_prefix('/').unwrap_or(term);
    tree.entries_in_order()
        .into_iter()
        .find(|id| tree.entry_path(*id) == term)
}

fn find_global(tree: &Tree, pattern: &str) -> Result<Vec<EntryId>> {
    let re = full_match(pattern)?;
    Ok(tree
        .entries_in_order()
        .into_iter()
        .filter(|id| re.is_match(&tree.entry_path(*id)))
        .collect())
}

fn find_by_group_and_title(tree: &Tree, term: &str) -> Result<Vec<EntryId>> {
    let (group_path, title_pattern) = term.rsplit_once('/').unwrap_or(("", term));
    let title = full_match(title_pattern)?;

    let mut found = Vec::new();
    for group in resolve_groups(tree, group_path, tree.root())? {
        found.extend(
            tree.group(group)
                .entries
                .iter()
                .copied()
                .filter(|id| title.is_match(&tree.entry(*id).title)),
        );
    }
    Ok(found)
}
