//! Group lookup by slash-delimited path expressions.
//!
//! Every segment of the expression is a regular expression matched against
//! the full name of a group one level below the current candidates.

use crate::error::{LookupError, Result};
use crate::models::{GroupId, Tree};
use regex::Regex;

/// Compile `pattern` so that it only matches whole strings.
pub(crate) fn full_match(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| LookupError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Find all groups reachable from `start` by matching `path_expr` one
/// segment per tree level.
///
/// Results come in discovery order: parents before descendants, and within a
/// level in stored child order. Leading and trailing slashes are ignored and
/// an empty expression resolves to `start` itself.
pub fn resolve_groups(tree: &Tree, path_expr: &str, start: GroupId) -> Result<Vec<GroupId>> {
    let path_expr = path_expr.trim_matches('/');
    if path_expr.is_empty() {
        return Ok(vec![start]);
    }

    let (head, tail) = match path_expr.split_once('/') {
        Some((head, tail)) => (head, Some(tail)),
        None => (path_expr, None),
    };
    let re = full_match(head)?;

    let matched: Vec<GroupId> = tree
        .group(start)
        .groups
        .iter()
        .copied()
        .filter(|id| re.is_match(&tree.group(*id).name))
        .collect();

    let Some(tail) = tail else {
        return Ok(matched);
    };

    let mut out = Vec::new();
    for group in matched {
        for found in resolve_groups(tree, tail, group)? {
            if !out.contains(&found) {
                out.push(found);
            }
        }
    }
    Ok(out)
}
