#![allow(dead_code)]

use capri_core::{Entity, PersistenceUnit, SessionFactory};
use rusqlite::types::Value;
use rusqlite::Row;
use std::path::Path;
use std::sync::Arc;

pub const PEOPLE_DDL: &str = "CREATE TABLE IF NOT EXISTS people (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    email TEXT UNIQUE
);";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}

impl Person {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }
}

impl Entity for Person {
    type Key = i64;

    const NAME: &'static str = "Person";
    const TABLE: &'static str = "people";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["name", "email"];

    fn key(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            self.email.clone().map_or(Value::Null, Value::Text),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
        })
    }
}

pub fn people_unit(name: &str) -> PersistenceUnit {
    PersistenceUnit::in_memory(name).with_schema(PEOPLE_DDL)
}

pub fn memory_factory() -> Arc<SessionFactory> {
    Arc::new(SessionFactory::open(&people_unit("test")).unwrap())
}

pub fn file_factory(path: &Path) -> Arc<SessionFactory> {
    let unit = PersistenceUnit::file("disk", path).with_schema(PEOPLE_DDL);
    Arc::new(SessionFactory::open(&unit).unwrap())
}

pub fn row_count(factory: &SessionFactory) -> i64 {
    let session = factory.open_session().unwrap();
    let count = session
        .connection()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM people;", [], |row| row.get(0))
        .unwrap();
    count
}
