//! Persistence unit configuration.
//!
//! # Responsibility
//! - Parse named persistence units from TOML.
//! - Resolve a unit identifier to a concrete SQLite datastore setup.
//!
//! # Invariants
//! - Unit names are non-blank, unique, and match `[A-Za-z0-9_.-]+`.
//! - A loaded `PersistenceConfig` has always passed `validate()`.

use crate::util::strings::is_null_or_white_space;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment variable overriding the default configuration file path.
pub const CONFIG_PATH_ENV: &str = "CAPRI_PERSISTENCE_CONFIG";
/// Configuration file used when `CONFIG_PATH_ENV` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "persistence.toml";
/// `database` value selecting a private in-memory store.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

static UNIT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("valid unit name regex"));

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or resolving persistence configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    BlankUnitName,
    InvalidUnitName(String),
    DuplicateUnit(String),
    UnknownUnit(String),
    InvalidUnit {
        unit: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid persistence config: {err}"),
            Self::BlankUnitName => write!(f, "persistence unit name must not be blank"),
            Self::InvalidUnitName(name) => write!(
                f,
                "persistence unit name `{name}` must match [A-Za-z0-9_.-]+"
            ),
            Self::DuplicateUnit(name) => write!(f, "persistence unit `{name}` declared twice"),
            Self::UnknownUnit(name) => write!(f, "unknown persistence unit `{name}`"),
            Self::InvalidUnit { unit, reason } => {
                write!(f, "invalid persistence unit `{unit}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// One named datastore setup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceUnit {
    pub name: String,
    /// `":memory:"` or a filesystem path.
    pub database: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
    /// DDL applied once, atomically, when a factory is built for this unit.
    #[serde(default)]
    pub schema: Vec<String>,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_foreign_keys() -> bool {
    true
}

impl PersistenceUnit {
    /// Unit backed by a private in-memory store.
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self::with_database(name, IN_MEMORY_DATABASE)
    }

    /// Unit backed by a database file.
    pub fn file(name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self::with_database(name, path.as_ref().to_string_lossy())
    }

    fn with_database(name: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            database: database.into(),
            busy_timeout_ms: default_busy_timeout_ms(),
            foreign_keys: default_foreign_keys(),
            schema: Vec::new(),
        }
    }

    /// Appends one bootstrap DDL statement.
    pub fn with_schema(mut self, statement: impl Into<String>) -> Self {
        self.schema.push(statement.into());
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database.trim() == IN_MEMORY_DATABASE
    }

    /// Checks name and datastore fields.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_unit_name(&self.name)?;
        if self.name.trim() != self.name {
            return Err(ConfigError::InvalidUnitName(self.name.clone()));
        }
        if is_null_or_white_space(Some(&self.database)) {
            return Err(ConfigError::InvalidUnit {
                unit: self.name.clone(),
                reason: "database must not be blank".to_string(),
            });
        }
        Ok(())
    }
}

/// Set of persistence units, usually read from `persistence.toml`.
///
/// ```toml
/// [[unit]]
/// name = "test"
/// database = ":memory:"
/// schema = ["CREATE TABLE IF NOT EXISTS people (id INTEGER PRIMARY KEY, name TEXT NOT NULL)"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default, rename = "unit")]
    pub units: Vec<PersistenceUnit>,
}

impl PersistenceConfig {
    /// Config holding exactly one unit.
    pub fn single(unit: PersistenceUnit) -> Self {
        Self { units: vec![unit] }
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads from `$CAPRI_PERSISTENCE_CONFIG`, falling back to `persistence.toml`.
    pub fn load_default() -> ConfigResult<Self> {
        Self::load_from_file(default_config_path())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for unit in &self.units {
            unit.validate()?;
            if !seen.insert(unit.name.as_str()) {
                return Err(ConfigError::DuplicateUnit(unit.name.clone()));
            }
        }
        Ok(())
    }

    /// Resolves a unit identifier.
    pub fn unit(&self, name: &str) -> ConfigResult<&PersistenceUnit> {
        validate_unit_name(name)?;
        let name = name.trim();
        self.units
            .iter()
            .find(|unit| unit.name == name)
            .ok_or_else(|| ConfigError::UnknownUnit(name.to_string()))
    }
}

/// Effective configuration path after applying the environment override.
pub fn default_config_path() -> PathBuf {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path.trim()),
        _ => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}

pub(crate) fn validate_unit_name(name: &str) -> ConfigResult<()> {
    if is_null_or_white_space(Some(name)) {
        return Err(ConfigError::BlankUnitName);
    }
    if !UNIT_NAME_RE.is_match(name.trim()) {
        return Err(ConfigError::InvalidUnitName(name.to_string()));
    }
    Ok(())
}
