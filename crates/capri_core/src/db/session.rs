//! Per-operation session over one SQLite connection.
//!
//! # Responsibility
//! - Provide explicit begin/commit/rollback control for a single unit of work.
//! - Execute entity lookups and writes generated from `Entity` metadata.
//!
//! # Invariants
//! - `is_active()` mirrors the connection state: true iff a transaction is open.
//! - Release (explicit `close` or drop) rolls back an open transaction first.
//! - Release never reports errors.

use super::query::translate;
use super::{DbError, DbResult};
use crate::model::entity::{select_columns, Entity};
use rusqlite::{params, Connection, ToSql};
use std::sync::Arc;

/// Locking intent declared when a transaction begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// `BEGIN DEFERRED`: no lock until the first read.
    Read,
    /// `BEGIN IMMEDIATE`: takes the write lock up front so writers serialize.
    Write,
}

impl TransactionMode {
    fn begin_sql(self) -> &'static str {
        match self {
            Self::Read => "BEGIN DEFERRED;",
            Self::Write => "BEGIN IMMEDIATE;",
        }
    }
}

/// Short-lived handle to the datastore. Created by `SessionFactory`.
pub struct Session {
    conn: Option<Connection>,
    unit: Arc<str>,
}

impl Session {
    pub(super) fn new(conn: Connection, unit: Arc<str>) -> Self {
        Self {
            conn: Some(conn),
            unit,
        }
    }

    /// Persistence unit this session was opened against.
    pub fn unit_name(&self) -> &str {
        &self.unit
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.conn
            .as_ref()
            .is_some_and(|conn| !conn.is_autocommit())
    }

    pub fn begin(&mut self, mode: TransactionMode) -> DbResult<()> {
        let conn = self.connection()?;
        if !conn.is_autocommit() {
            return Err(DbError::TransactionAlreadyActive);
        }
        conn.execute_batch(mode.begin_sql())?;
        Ok(())
    }

    /// Commits the active transaction.
    ///
    /// A failed commit (e.g. `SQLITE_BUSY`) may leave the transaction
    /// active; callers are expected to roll back in that case.
    pub fn commit(&mut self) -> DbResult<()> {
        let conn = self.connection()?;
        if conn.is_autocommit() {
            return Err(DbError::NoActiveTransaction);
        }
        conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    pub fn rollback(&mut self) -> DbResult<()> {
        let conn = self.connection()?;
        if conn.is_autocommit() {
            return Err(DbError::NoActiveTransaction);
        }
        conn.execute_batch("ROLLBACK;")?;
        Ok(())
    }

    /// Releases the connection. Errors are swallowed.
    pub fn close(mut self) {
        self.release();
    }

    /// Looks up one record by key.
    pub fn find<T: Entity>(&self, key: &T::Key) -> DbResult<Option<T>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE {} = ?1;",
            select_columns::<T>(),
            T::TABLE,
            T::KEY_COLUMN
        ))?;

        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(T::from_row(row)?));
        }

        Ok(None)
    }

    /// Returns whether a record with this entity's identity is visible to
    /// the current transaction.
    pub fn contains<T: Entity>(&self, entity: &T) -> DbResult<bool> {
        self.contains_key::<T>(&entity.key())
    }

    pub fn contains_key<T: Entity>(&self, key: &T::Key) -> DbResult<bool> {
        let conn = self.connection()?;
        let exists: i64 = conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1);",
                T::TABLE,
                T::KEY_COLUMN
            ),
            params![key],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    /// Inserts a new record. Fails on key conflicts.
    pub fn persist<T: Entity>(&self, entity: &T) -> DbResult<()> {
        let conn = self.connection()?;
        let key = entity.key();
        let values = checked_values(entity)?;

        let mut binds: Vec<&dyn ToSql> = Vec::with_capacity(values.len() + 1);
        binds.push(&key);
        binds.extend(values.iter().map(|value| value as &dyn ToSql));

        conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({});",
                T::TABLE,
                select_columns::<T>(),
                placeholders(binds.len())
            ),
            binds.as_slice(),
        )?;
        Ok(())
    }

    /// Writes the entity state by key, inserting when the key is unknown,
    /// and returns the stored record.
    pub fn merge<T: Entity>(&self, entity: &T) -> DbResult<T> {
        let conn = self.connection()?;
        let key = entity.key();
        let values = checked_values(entity)?;

        let mut binds: Vec<&dyn ToSql> = Vec::with_capacity(values.len() + 1);
        binds.push(&key);
        binds.extend(values.iter().map(|value| value as &dyn ToSql));

        let conflict_action = if T::COLUMNS.is_empty() {
            "DO NOTHING".to_string()
        } else {
            let assignments = T::COLUMNS
                .iter()
                .map(|column| format!("{column} = excluded.{column}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("DO UPDATE SET {assignments}")
        };

        conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {};",
                T::TABLE,
                select_columns::<T>(),
                placeholders(binds.len()),
                T::KEY_COLUMN,
                conflict_action
            ),
            binds.as_slice(),
        )?;

        self.find::<T>(&key)?.ok_or_else(|| {
            DbError::Mapping(format!(
                "merged {} `{key}` is not readable by key",
                T::NAME
            ))
        })
    }

    /// Deletes by key. Returns whether a row was removed.
    pub fn remove<T: Entity>(&self, key: &T::Key) -> DbResult<bool> {
        let conn = self.connection()?;
        let changed = conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?1;", T::TABLE, T::KEY_COLUMN),
            params![key],
        )?;
        Ok(changed > 0)
    }

    /// Runs an entity query (`SELECT e FROM <Type> e`) and maps every row.
    pub fn query<T: Entity>(&self, query: &str) -> DbResult<Vec<T>> {
        let sql = translate::<T>(query)?;
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(T::from_row(row)?);
        }

        Ok(records)
    }

    /// Raw connection access for bootstrap and diagnostics.
    pub fn connection(&self) -> DbResult<&Connection> {
        self.conn.as_ref().ok_or(DbError::SessionClosed)
    }

    fn release(&mut self) {
        if let Some(conn) = self.conn.take() {
            if !conn.is_autocommit() {
                let _ = conn.execute_batch("ROLLBACK;");
            }
            let _ = conn.close();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}

fn checked_values<T: Entity>(entity: &T) -> DbResult<Vec<rusqlite::types::Value>> {
    let values = entity.values();
    if values.len() != T::COLUMNS.len() {
        return Err(DbError::Mapping(format!(
            "{} yields {} values for {} columns",
            T::NAME,
            values.len(),
            T::COLUMNS.len()
        )));
    }
    Ok(values)
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ")
}
