use anyhow::Result;
use keepass::{config::DatabaseConfig, db::Node, db::Value, Database, DatabaseKey};
use std::fs::File;

fn main() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "fixture.kdbx".to_string());

    let mut db = Database::new(DatabaseConfig::default());
    db.meta.database_name = Some("Lookup fixture".to_string());

    let mut servers = keepass::db::Group::new("Servers");

    let mut entry = keepass::db::Entry::new();
    entry.fields.insert("Title".to_string(), Value::Unprotected("db1".to_string()));
    entry.fields.insert("UserName".to_string(), Value::Unprotected("admin".to_string()));
    entry.fields.insert("Password".to_string(), Value::Protected("secret".as_bytes().into()));
    entry.fields.insert("URL".to_string(), Value::Unprotected("postgres://db1:5432".to_string()));
    servers.children.push(Node::Entry(entry));

    let mut web = keepass::db::Entry::new();
    web.fields.insert("Title".to_string(), Value::Unprotected("web1".to_string()));
    web.fields.insert("UserName".to_string(), Value::Unprotected("deploy".to_string()));
    servers.children.push(Node::Entry(web));

    db.root.children.push(Node::Group(servers));

    let key = DatabaseKey::new().with_password("password");
    let mut file = File::create(&path)?;
    db.save(&mut file, key)?;

    println!("Created {path} with password 'password'");
    Ok(())
}
