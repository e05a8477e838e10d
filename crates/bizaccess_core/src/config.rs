//! Service configuration.
//!
//! # Responsibility
//! - Describe which tenant a service is bound to and where its two
//!   databases live.
//! - Load that description from the process environment.
//!
//! # Invariants
//! - A config that passed `validate()` has a non-blank tenant id and
//!   non-blank database paths.
//! - Validation happens before any database handle is opened.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_BUSINESS_ID: &str = "BIZACCESS_BUSINESS_ID";
pub const ENV_PLATFORM_DB: &str = "BIZACCESS_PLATFORM_DB";
pub const ENV_REGION_DB: &str = "BIZACCESS_REGION_DB";
pub const ENV_LOG_LEVEL: &str = "BIZACCESS_LOG_LEVEL";

/// Value accepted in place of a path to request an in-memory database.
pub const MEMORY_LOCATION: &str = ":memory:";

/// Where one SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbLocation {
    File(PathBuf),
    Memory,
}

impl DbLocation {
    /// Parses an environment-style location string.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed == MEMORY_LOCATION {
            Self::Memory
        } else {
            Self::File(PathBuf::from(trimmed))
        }
    }
}

/// Configuration for one tenant-bound access service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Tenant the service instance is bound to for its whole lifetime.
    pub business_id: String,
    /// Tenant registry database.
    pub platform_db: DbLocation,
    /// Tenant region database.
    pub region_db: DbLocation,
    /// Optional log level override; `None` uses the build default.
    #[serde(default)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required environment variable is unset.
    MissingVar(&'static str),
    /// Tenant id is blank after trim.
    BlankBusinessId,
    /// A file location has an empty path.
    BlankPath(&'static str),
    /// Log level is not one of the supported names.
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingVar(name) => write!(f, "missing environment variable `{name}`"),
            Self::BlankBusinessId => write!(f, "business_id must not be blank"),
            Self::BlankPath(field) => write!(f, "`{field}` path must not be blank"),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {}

impl ServiceConfig {
    /// Creates a config with both databases held in memory.
    pub fn in_memory(business_id: impl Into<String>) -> Self {
        Self {
            business_id: business_id.into(),
            platform_db: DbLocation::Memory,
            region_db: DbLocation::Memory,
            log_level: None,
        }
    }

    /// Loads and validates config from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads and validates config through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::MissingVar(name));

        let config = Self {
            business_id: required(ENV_BUSINESS_ID)?.trim().to_string(),
            platform_db: DbLocation::parse(&required(ENV_PLATFORM_DB)?),
            region_db: DbLocation::parse(&required(ENV_REGION_DB)?),
            log_level: lookup(ENV_LOG_LEVEL).filter(|value| !value.trim().is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks field-level constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.business_id.trim().is_empty() {
            return Err(ConfigError::BlankBusinessId);
        }
        check_location(&self.platform_db, "platform_db")?;
        check_location(&self.region_db, "region_db")?;
        if let Some(level) = &self.log_level {
            crate::logging::normalize_level(level).map_err(ConfigError::InvalidLogLevel)?;
        }
        Ok(())
    }

    /// Returns the configured log level or the build-mode default.
    pub fn effective_log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .unwrap_or(crate::logging::default_log_level())
    }
}

fn check_location(location: &DbLocation, field: &'static str) -> Result<(), ConfigError> {
    match location {
        DbLocation::File(path) if path.as_os_str().is_empty() => Err(ConfigError::BlankPath(field)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, DbLocation, ServiceConfig, ENV_BUSINESS_ID, ENV_LOG_LEVEL, ENV_PLATFORM_DB,
        ENV_REGION_DB,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn from_lookup_reads_all_fields() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            (ENV_BUSINESS_ID, " T1 "),
            (ENV_PLATFORM_DB, "/var/lib/bizaccess/platform.db"),
            (ENV_REGION_DB, ":memory:"),
            (ENV_LOG_LEVEL, "warn"),
        ]))
        .expect("config should load");

        assert_eq!(config.business_id, "T1");
        assert_eq!(
            config.platform_db,
            DbLocation::File(PathBuf::from("/var/lib/bizaccess/platform.db"))
        );
        assert_eq!(config.region_db, DbLocation::Memory);
        assert_eq!(config.effective_log_level(), "warn");
    }

    #[test]
    fn from_lookup_reports_first_missing_variable() {
        let err = ServiceConfig::from_lookup(lookup_from(&[(ENV_BUSINESS_ID, "T1")]))
            .expect_err("platform db is required");
        assert_eq!(err, ConfigError::MissingVar(ENV_PLATFORM_DB));
    }

    #[test]
    fn validate_rejects_blank_business_id() {
        let config = ServiceConfig::in_memory("   ");
        assert_eq!(config.validate(), Err(ConfigError::BlankBusinessId));
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let mut config = ServiceConfig::in_memory("T1");
        config.log_level = Some("loud".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }
}
