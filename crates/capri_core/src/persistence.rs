//! Process-wide session factory guard.
//!
//! # Responsibility
//! - Configure the shared `SessionFactory` exactly once per process.
//! - Hand the configured factory to services built via `EntityService::from_global`.
//!
//! # Invariants
//! - A second successful configuration is impossible; later calls fail with
//!   `AlreadyConfigured` naming the active unit.
//! - Blank or unknown unit identifiers are rejected before any factory exists.
//! - Using the global factory before configuration fails with `NotConfigured`.

use crate::config::{validate_unit_name, PersistenceConfig};
use crate::db::SessionFactory;
use crate::service::entity_service::{ServiceError, ServiceResult};
use log::{error, info, warn};
use once_cell::sync::OnceCell;
use std::sync::Arc;

static GLOBAL_FACTORY: OnceCell<Arc<SessionFactory>> = OnceCell::new();

/// Configures the process-wide factory from the default configuration file.
///
/// See `PersistenceConfig::load_default` for file resolution.
pub fn configure(unit_name: &str) -> ServiceResult<()> {
    validate_unit_name(unit_name)?;
    reject_if_configured(unit_name)?;
    let config = PersistenceConfig::load_default()?;
    configure_with(&config, unit_name)
}

/// Configures the process-wide factory for `unit_name` resolved in `config`.
///
/// # Errors
/// - `Config` when the name is blank/invalid or not declared in `config`.
/// - `AlreadyConfigured` when a factory was configured earlier.
/// - `Transaction` when the datastore cannot be opened or bootstrapped.
pub fn configure_with(config: &PersistenceConfig, unit_name: &str) -> ServiceResult<()> {
    let unit = config.unit(unit_name)?;
    reject_if_configured(&unit.name)?;

    let mut created = false;
    let factory = GLOBAL_FACTORY.get_or_try_init(|| -> ServiceResult<Arc<SessionFactory>> {
        let factory = SessionFactory::open(unit).map_err(|source| {
            error!(
                "event=persistence_configure module=persistence status=error unit={} error={}",
                unit.name, source
            );
            ServiceError::Transaction {
                operation: "configure",
                source,
            }
        })?;
        created = true;
        Ok(Arc::new(factory))
    })?;

    // Another thread may have won the initialization race.
    if !created {
        return Err(already_configured(factory, &unit.name));
    }

    info!(
        "event=persistence_configure module=persistence status=ok unit={} location={}",
        factory.unit_name(),
        factory.location()
    );
    Ok(())
}

/// Returns the configured process-wide factory.
pub fn global_factory() -> ServiceResult<Arc<SessionFactory>> {
    GLOBAL_FACTORY
        .get()
        .cloned()
        .ok_or(ServiceError::NotConfigured)
}

/// Name of the configured unit, or `None` before configuration.
pub fn configured_unit() -> Option<String> {
    GLOBAL_FACTORY
        .get()
        .map(|factory| factory.unit_name().to_string())
}

fn reject_if_configured(requested: &str) -> ServiceResult<()> {
    match GLOBAL_FACTORY.get() {
        Some(factory) => Err(already_configured(factory, requested)),
        None => Ok(()),
    }
}

fn already_configured(factory: &SessionFactory, requested: &str) -> ServiceError {
    warn!(
        "event=persistence_configure module=persistence status=rejected active_unit={} requested_unit={}",
        factory.unit_name(),
        requested.trim()
    );
    ServiceError::AlreadyConfigured {
        unit: factory.unit_name().to_string(),
    }
}
