// End-to-end lookups against a real KDBX file written with the keepass crate.

use keepass::{config::DatabaseConfig, db::Node, db::Value, Database, DatabaseKey};
use kplookup_core::{lookup, LookupConfig, LookupError, RegexMode, Secret};
use serde_json::json;
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MASTER: &str = "correct horse";

fn text_entry(title: &str, username: &str, password: &str) -> keepass::db::Entry {
    let mut entry = keepass::db::Entry::new();
    entry.fields.insert("Title".to_string(), Value::Unprotected(title.to_string()));
    entry.fields.insert("UserName".to_string(), Value::Unprotected(username.to_string()));
    entry.fields.insert("Password".to_string(), Value::Protected(password.as_bytes().into()));
    entry
}

fn write_store(dir: &Path) -> PathBuf {
    let mut db = Database::new(DatabaseConfig::default());

    let mut servers = keepass::db::Group::new("Servers");
    servers.children.push(Node::Entry(text_entry("db1", "admin", "secret")));
    servers.children.push(Node::Entry(text_entry("db2", "ops", "hunter2")));
    db.root.children.push(Node::Group(servers));
    db.root.children.push(Node::Entry(text_entry("mail", "me", "letmein")));

    let path = dir.join("store.kdbx");
    let mut file = File::create(&path).unwrap();
    db.save(&mut file, DatabaseKey::new().with_password(MASTER)).unwrap();
    path
}

#[test]
fn exact_lookup_reads_entry_from_file() {
    let dir = TempDir::new().unwrap();
    let path = write_store(dir.path());
    let config = LookupConfig::new(&path, Secret::new(MASTER));

    let out = lookup(&["Servers/db1", "mail"], &config).unwrap();

    assert_eq!(out.len(), 2);
    let db1 = &out[0][0];
    assert_eq!(db1.get("username"), Some(&json!("admin")));
    assert_eq!(db1.get("group"), Some(&json!("Servers")));
    assert_eq!(db1.get("parentgroup"), Some(&json!("/")));
    assert_eq!(db1.get("history"), Some(&json!([])));
    assert!(!db1.contains_key("password"));
    assert_eq!(out[1][0].get("path"), Some(&json!("mail")));
}

#[test]
fn global_regex_lookup_with_passwords() {
    let dir = TempDir::new().unwrap();
    let path = write_store(dir.path());
    let mut config = LookupConfig::new(&path, Secret::new(MASTER));
    config.regex = true;
    config.regex_mode = RegexMode::Global;
    config.include_password = true;

    let out = lookup(&["Servers/.*"], &config).unwrap();

    assert_eq!(out[0].len(), 2);
    assert_eq!(out[0][0].get("password"), Some(&json!("secret")));
    assert_eq!(out[0][1].get("password"), Some(&json!("hunter2")));
}

#[test]
fn wrong_master_password_is_an_authentication_error() {
    let dir = TempDir::new().unwrap();
    let path = write_store(dir.path());
    let config = LookupConfig::new(&path, Secret::new("not it"));

    let err = lookup(&["Servers/db1"], &config).unwrap_err();
    assert!(matches!(err, LookupError::Authentication));
    assert!(!err.to_string().contains("not it"));
}

#[test]
fn missing_file_is_a_connection_error() {
    let dir = TempDir::new().unwrap();
    let config = LookupConfig::new(dir.path().join("absent.kdbx"), Secret::new(MASTER));

    let err = lookup(&["Servers/db1"], &config).unwrap_err();
    assert!(matches!(err, LookupError::Connection { .. }));
    assert_eq!(err.kind(), "connection");
}

#[test]
fn garbage_file_is_not_an_authentication_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.kdbx");
    std::fs::write(&path, b"definitely not a keepass file").unwrap();
    let config = LookupConfig::new(&path, Secret::new(MASTER));

    let err = lookup(&["Servers/db1"], &config).unwrap_err();
    assert!(matches!(err, LookupError::Corrupt { .. }));
}

// Servers/db1 carries two attachments and one history snapshot with its own
// attachment; Servers/web1 has none. Master password "fixture".
const ATTACHMENT_STORE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/attachments.kdbx"
);

#[test]
fn attachment_names_are_read_from_the_file() {
    let config = LookupConfig::new(ATTACHMENT_STORE, Secret::new("fixture"));

    let out = lookup(&["Servers/db1", "Servers/web1"], &config).unwrap();

    let db1 = &out[0][0];
    assert_eq!(db1.get("username"), Some(&json!("admin")));
    assert_eq!(db1.get("group"), Some(&json!("Servers")));
    assert_eq!(db1.get("parentgroup"), Some(&json!("/")));
    assert_eq!(
        db1.get("attachments"),
        Some(&json!(["key.pem", "ca & chain.crt"]))
    );
    assert!(db1.get("custom_properties").is_some_and(|props| props.get("key.pem").is_none()));

    let history = db1.get("history").and_then(|h| h.as_array()).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["username"], json!("root"));
    assert_eq!(history[0]["attachments"], json!(["old.pem"]));

    assert_eq!(out[1][0].get("attachments"), Some(&json!([])));
}
