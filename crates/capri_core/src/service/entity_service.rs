//! Generic entity CRUD service.
//!
//! # Responsibility
//! - Provide find-by-id, find-all, create, update and delete for any `Entity`.
//! - Run each call as one transaction script on its own session.
//!
//! # Invariants
//! - Per call: open session, begin, one unit of work, then commit on success
//!   or roll back (only if still active) on failure. The session is always
//!   released, and release errors are never surfaced.
//! - Absent records are `Ok(None)` / `Ok(false)`, never errors.
//! - Failures carry an explicit kind; nothing is masked as "not found".
//! - `delete` looks up and removes inside one write transaction.

use crate::config::ConfigError;
use crate::db::query::select_all;
use crate::db::{DbError, Session, SessionFactory, TransactionMode};
use crate::model::entity::Entity;
use crate::persistence::global_factory;
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced by entity service operations and factory configuration.
#[derive(Debug)]
pub enum ServiceError {
    /// No process-wide factory has been configured.
    NotConfigured,
    /// The process-wide factory is already bound to `unit`.
    AlreadyConfigured { unit: String },
    Config(ConfigError),
    /// `create` found an existing record under `DuplicatePolicy::Reject`.
    Duplicate { entity: &'static str, key: String },
    /// The provider failed; the transaction was rolled back if it was active.
    Transaction {
        operation: &'static str,
        source: DbError,
    },
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "persistence is not configured"),
            Self::AlreadyConfigured { unit } => {
                write!(f, "persistence already configured with unit `{unit}`")
            }
            Self::Config(err) => write!(f, "{err}"),
            Self::Duplicate { entity, key } => write!(f, "{entity} `{key}` already exists"),
            Self::Transaction { operation, source } => {
                write!(f, "{operation} failed: {source}")
            }
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Transaction { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for ServiceError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// What `create` does when the identity is already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Treat as success and hand the input back unchanged.
    #[default]
    ReturnInput,
    /// Fail with `ServiceError::Duplicate`.
    Reject,
}

/// Why a unit of work stopped before commit.
enum Abort {
    Db(DbError),
    Service(ServiceError),
}

impl From<DbError> for Abort {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl Abort {
    fn into_service_error(self, operation: &'static str) -> ServiceError {
        match self {
            Self::Db(source) => ServiceError::Transaction { operation, source },
            Self::Service(err) => err,
        }
    }
}

/// Transaction-per-operation CRUD facade for entity type `T`.
pub struct EntityService<T: Entity> {
    factory: Arc<SessionFactory>,
    duplicate_policy: DuplicatePolicy,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for EntityService<T> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            duplicate_policy: self.duplicate_policy,
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> EntityService<T> {
    /// Creates a service on an explicitly provided factory.
    pub fn new(factory: Arc<SessionFactory>) -> Self {
        Self {
            factory,
            duplicate_policy: DuplicatePolicy::default(),
            _entity: PhantomData,
        }
    }

    /// Creates a service on the process-wide factory.
    ///
    /// Fails with `NotConfigured` until `persistence::configure*` succeeded.
    pub fn from_global() -> ServiceResult<Self> {
        Ok(Self::new(global_factory()?))
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    pub fn factory(&self) -> &Arc<SessionFactory> {
        &self.factory
    }

    /// Looks up one record. `Ok(None)` when the key is absent.
    pub fn get_by_id(&self, id: &T::Key) -> ServiceResult<Option<T>> {
        self.run_in_transaction("get_by_id", TransactionMode::Read, |session| {
            Ok(session.find::<T>(id)?)
        })
    }

    /// Returns every stored record ordered by key; empty when none exist.
    pub fn get_all(&self) -> ServiceResult<Vec<T>> {
        self.run_in_transaction("get_all", TransactionMode::Read, |session| {
            Ok(session.query::<T>(&select_all::<T>())?)
        })
    }

    /// Inserts `entity` and returns it.
    ///
    /// When the identity is already stored, nothing is written and the
    /// outcome follows `DuplicatePolicy`.
    pub fn create(&self, entity: T) -> ServiceResult<T> {
        let policy = self.duplicate_policy;
        self.run_in_transaction("create", TransactionMode::Write, move |session| {
            if session.contains(&entity)? {
                return match policy {
                    DuplicatePolicy::ReturnInput => Ok(entity),
                    DuplicatePolicy::Reject => Err(Abort::Service(ServiceError::Duplicate {
                        entity: T::NAME,
                        key: entity.key().to_string(),
                    })),
                };
            }
            session.persist(&entity)?;
            Ok(entity)
        })
    }

    /// Merges `entity` into storage and returns the stored record.
    ///
    /// An unknown key creates the record.
    pub fn update(&self, entity: T) -> ServiceResult<T> {
        self.run_in_transaction("update", TransactionMode::Write, move |session| {
            Ok(session.merge(&entity)?)
        })
    }

    /// Removes the record with `id`. `Ok(false)` when it does not exist.
    pub fn delete(&self, id: &T::Key) -> ServiceResult<bool> {
        self.run_in_transaction("delete", TransactionMode::Write, |session| {
            if !session.contains_key::<T>(id)? {
                return Ok(false);
            }
            Ok(session.remove::<T>(id)?)
        })
    }

    fn run_in_transaction<R>(
        &self,
        operation: &'static str,
        mode: TransactionMode,
        work: impl FnOnce(&Session) -> Result<R, Abort>,
    ) -> ServiceResult<R> {
        let started_at = Instant::now();
        let result = self.execute(operation, mode, work);

        match &result {
            Ok(_) => debug!(
                "event=entity_{operation} module=service status=ok entity={} unit={} duration_ms={}",
                T::NAME,
                self.factory.unit_name(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=entity_{operation} module=service status=error entity={} unit={} duration_ms={} error={}",
                T::NAME,
                self.factory.unit_name(),
                started_at.elapsed().as_millis(),
                err
            ),
        }

        result
    }

    fn execute<R>(
        &self,
        operation: &'static str,
        mode: TransactionMode,
        work: impl FnOnce(&Session) -> Result<R, Abort>,
    ) -> ServiceResult<R> {
        let mut session = self
            .factory
            .open_session()
            .map_err(|source| ServiceError::Transaction { operation, source })?;

        let result = match transaction_script(&mut session, mode, work) {
            Ok(value) => Ok(value),
            Err(abort) => {
                rollback_if_active(&mut session);
                Err(abort.into_service_error(operation))
            }
        };

        session.close();
        result
    }
}

fn transaction_script<R>(
    session: &mut Session,
    mode: TransactionMode,
    work: impl FnOnce(&Session) -> Result<R, Abort>,
) -> Result<R, Abort> {
    session.begin(mode)?;
    let value = work(session)?;
    session.commit()?;
    Ok(value)
}

fn rollback_if_active(session: &mut Session) {
    if session.is_active() {
        let _ = session.rollback();
    }
}
