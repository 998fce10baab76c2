//! Entity mapping trait consumed by sessions and the generic service.
//!
//! # Responsibility
//! - Expose the table/column metadata needed to build SQL for any record type.
//! - Convert records to bind values and back from result rows.
//!
//! # Invariants
//! - `values()` yields exactly one value per entry of `COLUMNS`, in order.
//! - `from_row` reads columns by name, so column order in SQL is irrelevant.

use rusqlite::types::Value;
use rusqlite::{Row, ToSql};
use std::fmt::{Debug, Display};

/// Mapping metadata for a record type managed by `EntityService`.
///
/// Implementors describe one table with a single-column primary key. SQL
/// generation lives in the session layer; implementors only supply names
/// and value conversions.
pub trait Entity: Sized {
    /// Primary key type.
    type Key: ToSql + Clone + Display + Debug;

    /// Type name accepted in query strings (`SELECT e FROM <NAME> e`).
    const NAME: &'static str;
    /// Backing table.
    const TABLE: &'static str;
    /// Primary key column.
    const KEY_COLUMN: &'static str;
    /// Non-key columns written on insert/merge.
    const COLUMNS: &'static [&'static str];

    /// Returns this record's identity.
    fn key(&self) -> Self::Key;

    /// Returns bind values for `COLUMNS`, in the same order.
    fn values(&self) -> Vec<Value>;

    /// Builds a record from a row holding the key column and all `COLUMNS`.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Comma-separated projection of the key column followed by `COLUMNS`.
pub(crate) fn select_columns<T: Entity>() -> String {
    std::iter::once(T::KEY_COLUMN)
        .chain(T::COLUMNS.iter().copied())
        .collect::<Vec<_>>()
        .join(", ")
}
