//! Core persistence facade for Capri.
//! Generic transaction-per-operation CRUD over configured SQLite units.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod persistence;
pub mod service;
pub mod util;

pub use config::{ConfigError, PersistenceConfig, PersistenceUnit, CONFIG_PATH_ENV};
pub use db::{DbError, DbResult, Session, SessionFactory, TransactionMode};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entity::Entity;
pub use persistence::{configure, configure_with, configured_unit, global_factory};
pub use service::entity_service::{
    DuplicatePolicy, EntityService, ServiceError, ServiceResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
