//! Lookup entry point: open the database once, resolve every term in order.

use crate::config::LookupConfig;
use crate::database::KeepassDatabase;
use crate::error::Result;
use crate::matcher::{match_entries, MatchMode};
use crate::models::Tree;
use crate::serializer::{Record, Serializer, SCHEMA_VERSION};

/// Run `terms` against the database named in `config`.
///
/// Returns one list of records per term, in term order. Exact lookups
/// produce single-element lists. The first term without a match aborts the
/// whole batch.
pub fn lookup<S: AsRef<str>>(terms: &[S], config: &LookupConfig) -> Result<Vec<Vec<Record>>> {
    config.validate()?;

    let span = tracing::info_span!(
        "lookup",
        file = %config.kdbx_file.display(),
        terms = terms.len(),
        mode = ?config.match_mode(),
    );
    let _enter = span.enter();

    let db = KeepassDatabase::unlock(&config.kdbx_file, config.kdbx_password.expose())?;
    lookup_in(
        db.tree(),
        terms,
        config.match_mode(),
        config.include_password,
    )
}

/// Run `terms` against an already loaded tree.
pub fn lookup_in<S: AsRef<str>>(
    tree: &Tree,
    terms: &[S],
    mode: MatchMode,
    include_password: bool,
) -> Result<Vec<Vec<Record>>> {
    let serializer = Serializer::new(tree, include_password);
    tracing::debug!("Serializing with schema v{}", SCHEMA_VERSION);

    let mut results = Vec::with_capacity(terms.len());
    for term in terms {
        let term = term.as_ref();
        let records = match_entries(tree, term, mode)?
            .into_iter()
            .map(|id| serializer.serialize(id))
            .collect::<Result<Vec<_>>>()?;
        results.push(records);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::matcher::RegexMode;
    use crate::models::Entry;
    use serde_json::json;

    fn scenario() -> Tree {
        let mut tree = Tree::new("Root");
        let servers = tree.add_group(tree.root(), "Servers");
        tree.add_entry(
            servers,
            Entry::new("db1")
                .with_username("admin")
                .with_password("secret")
                .with_attachment("key.pem"),
        );
        tree.add_entry(servers, Entry::new("db2").with_username("ops"));
        tree
    }

    #[test]
    fn exact_lookup_yields_singleton_lists_in_term_order() {
        let tree = scenario();
        let out = lookup_in(&tree, &["Servers/db2", "Servers/db1"], MatchMode::Exact, false)
            .unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), 1);
        assert_eq!(out[0][0].get("title"), Some(&json!("db2")));
        assert_eq!(out[1][0].get("title"), Some(&json!("db1")));
        assert_eq!(out[1][0].get("attachments"), Some(&json!(["key.pem"])));
        assert!(!out[1][0].contains_key("password"));
    }

    #[test]
    fn global_regex_term_yields_all_matches() {
        let tree = scenario();
        let mode = MatchMode::Regex(RegexMode::Global);
        let out = lookup_in(&tree, &["Servers/db1.*", "Servers/.*"], mode, true).unwrap();

        assert_eq!(out[0].len(), 1);
        assert_eq!(out[0][0].get("password"), Some(&json!("secret")));
        assert_eq!(out[1].len(), 2);
    }

    #[test]
    fn one_missing_term_fails_the_batch() {
        let tree = scenario();
        let err = lookup_in(
            &tree,
            &["Servers/db1", "Servers/db9", "Servers/db2"],
            MatchMode::Exact,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, LookupError::NotFound { ref term } if term == "Servers/db9"));
    }

    #[test]
    fn no_terms_is_an_empty_result() {
        let tree = scenario();
        let terms: [&str; 0] = [];
        assert!(lookup_in(&tree, &terms, MatchMode::Exact, false)
            .unwrap()
            .is_empty());
    }
}
