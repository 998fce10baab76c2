//! Session factory bound to one persistence unit.
//!
//! # Responsibility
//! - Resolve a `PersistenceUnit` to a SQLite file or private in-memory store.
//! - Apply unit bootstrap DDL once, atomically, before any session exists.
//! - Hand out fresh, configured connections wrapped in `Session`.
//!
//! # Invariants
//! - Every session connection has `busy_timeout` and `foreign_keys` applied.
//! - In-memory stores live exactly as long as their factory. They use the
//!   `memdb` VFS, so writers serialize through `busy_timeout` like file stores.
//! - The factory is `Send + Sync`; sessions are created concurrently without
//!   extra locking.

use super::session::Session;
use super::DbResult;
use crate::config::PersistenceUnit;
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Creates sessions against one configured datastore.
pub struct SessionFactory {
    unit: Arc<str>,
    target: String,
    busy_timeout: Duration,
    foreign_keys: bool,
    // Keeps an in-memory store alive between sessions; a memdb database is
    // freed when its last connection closes. Never locked: the Mutex only
    // makes the non-Sync connection storable in a Sync factory.
    anchor: Option<Mutex<Connection>>,
}

impl SessionFactory {
    /// Builds a factory and bootstraps the unit schema.
    ///
    /// The unit is expected to have passed `PersistenceUnit::validate()`.
    ///
    /// # Side effects
    /// - Creates the database file when it does not exist yet.
    /// - Emits `factory_open` logging events with duration and status.
    pub fn open(unit: &PersistenceUnit) -> DbResult<Self> {
        let started_at = Instant::now();
        let in_memory = unit.is_in_memory();
        let mode = mode_label(in_memory);
        info!(
            "event=factory_open module=db status=start unit={} mode={mode}",
            unit.name
        );

        let target = if in_memory {
            format!(
                "file:/capri-{}-{}?vfs=memdb",
                unit.name,
                Uuid::new_v4().simple()
            )
        } else {
            unit.database.trim().to_string()
        };

        let mut factory = Self {
            unit: Arc::from(unit.name.as_str()),
            target,
            busy_timeout: Duration::from_millis(unit.busy_timeout_ms),
            foreign_keys: unit.foreign_keys,
            anchor: None,
        };

        match factory.bootstrap(&unit.schema) {
            Ok(conn) => {
                if in_memory {
                    factory.anchor = Some(Mutex::new(conn));
                }
                info!(
                    "event=factory_open module=db status=ok unit={} mode={mode} schema_statements={} duration_ms={}",
                    unit.name,
                    unit.schema.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(factory)
            }
            Err(err) => {
                error!(
                    "event=factory_open module=db status=error unit={} mode={mode} duration_ms={} error_code=factory_bootstrap_failed error={}",
                    unit.name,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Opens a new session on its own connection.
    pub fn open_session(&self) -> DbResult<Session> {
        let conn = self.connect()?;
        Ok(Session::new(conn, Arc::clone(&self.unit)))
    }

    pub fn unit_name(&self) -> &str {
        &self.unit
    }

    pub fn is_in_memory(&self) -> bool {
        self.anchor.is_some()
    }

    /// Database path, or `memory` for in-memory units.
    pub fn location(&self) -> &str {
        if self.is_in_memory() {
            "memory"
        } else {
            &self.target
        }
    }

    fn connect(&self) -> DbResult<Connection> {
        let conn = Connection::open_with_flags(
            &self.target,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(self.busy_timeout)?;
        let foreign_keys = if self.foreign_keys { "ON" } else { "OFF" };
        conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
        Ok(conn)
    }

    fn bootstrap(&self, schema: &[String]) -> DbResult<Connection> {
        let mut conn = self.connect()?;
        if !schema.is_empty() {
            let tx = conn.transaction()?;
            for statement in schema {
                tx.execute_batch(statement)?;
            }
            tx.commit()?;
        }
        Ok(conn)
    }
}

fn mode_label(in_memory: bool) -> &'static str {
    if in_memory {
        "memory"
    } else {
        "file"
    }
}
