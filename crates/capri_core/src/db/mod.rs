//! SQLite persistence provider: session factory, sessions, and entity queries.
//!
//! # Responsibility
//! - Resolve a persistence unit to SQLite connections.
//! - Expose per-operation sessions with explicit transaction control.
//! - Generate entity SQL from `Entity` mapping metadata.
//!
//! # Invariants
//! - A session owns its connection and is never shared across operations.
//! - At most one transaction is active per session.
//! - A dropped session never leaves a transaction open.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod factory;
pub mod query;
mod session;

pub use factory::SessionFactory;
pub use session::{Session, TransactionMode};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Query string outside the supported `SELECT e FROM <Type> e` form.
    InvalidQuery(String),
    SessionClosed,
    NoActiveTransaction,
    TransactionAlreadyActive,
    /// Stored state does not match the entity mapping.
    Mapping(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidQuery(message) => write!(f, "invalid entity query: {message}"),
            Self::SessionClosed => write!(f, "session is closed"),
            Self::NoActiveTransaction => write!(f, "no active transaction"),
            Self::TransactionAlreadyActive => write!(f, "transaction already active"),
            Self::Mapping(message) => write!(f, "entity mapping error: {message}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
