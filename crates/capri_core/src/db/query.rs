//! Entity query strings and their SQL translation.
//!
//! Only the select-all form `SELECT <alias> FROM <TypeName> <alias>` is
//! supported. The type name must equal `Entity::NAME` of the target type.

use super::{DbError, DbResult};
use crate::model::entity::{select_columns, Entity};
use once_cell::sync::Lazy;
use regex::Regex;

static SELECT_ALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*SELECT\s+([A-Za-z_][A-Za-z0-9_]*)\s+FROM\s+([A-Za-z_][A-Za-z0-9_]*)\s+([A-Za-z_][A-Za-z0-9_]*)\s*;?\s*$")
        .expect("valid select-all regex")
});

/// Builds the select-all query string for `T`.
pub fn select_all<T: Entity>() -> String {
    format!("SELECT e FROM {} e", T::NAME)
}

/// Translates an entity query into SQL over `T::TABLE`, ordered by key.
pub fn translate<T: Entity>(query: &str) -> DbResult<String> {
    let captures = SELECT_ALL_RE.captures(query).ok_or_else(|| {
        DbError::InvalidQuery(format!("unsupported query `{query}`"))
    })?;

    let projected = &captures[1];
    let type_name = &captures[2];
    let alias = &captures[3];

    if projected != alias {
        return Err(DbError::InvalidQuery(format!(
            "projection `{projected}` does not match alias `{alias}`"
        )));
    }
    if type_name != T::NAME {
        return Err(DbError::InvalidQuery(format!(
            "query targets `{type_name}` but result type is `{}`",
            T::NAME
        )));
    }

    Ok(format!(
        "SELECT {} FROM {} ORDER BY {} ASC;",
        select_columns::<T>(),
        T::TABLE,
        T::KEY_COLUMN
    ))
}
