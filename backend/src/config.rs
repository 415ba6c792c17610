//! Connection configuration loaded via OrthoConfig.
//!
//! Settings come from `SONGBOOK_*` environment variables, configuration
//! files, and command-line flags. The environment name selects the
//! connection string: `development` and `test` map to fixed local
//! databases, anything else needs an external URL.

use std::ffi::OsString;
use std::fmt;
use std::time::Duration;

use mockable::Env;
use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::outbound::persistence::PoolConfig;

/// Connection string for the `development` environment.
pub const DEVELOPMENT_DATABASE_URL: &str = "postgres://localhost:5432/songbook_development";
/// Connection string for the `test` environment.
pub const TEST_DATABASE_URL: &str = "postgres://localhost:5432/songbook_test";
/// Fallback variable consulted for environments without a fixed URL.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_POOL_MIN_IDLE: u32 = 2;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Errors raised while resolving configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A configuration source could not be read or merged.
    #[error("failed to load configuration: {message}")]
    Load {
        /// Loader diagnostic.
        message: String,
    },
    /// No source supplied a connection string.
    #[error(
        "no database URL for environment `{environment}`: set SONGBOOK_DATABASE_URL or {DATABASE_URL_ENV}"
    )]
    MissingDatabaseUrl {
        /// Environment that needed an external URL.
        environment: String,
    },
    /// Pool sizes are inconsistent.
    #[error("invalid pool settings: {message}")]
    InvalidPool {
        /// What is wrong with the sizes.
        message: String,
    },
}

/// Named deployment environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Local development database.
    Development,
    /// Local test database.
    Test,
    /// Any other name, e.g. `production`.
    Other(String),
}

impl Environment {
    /// Parse an environment name. Matching is case-insensitive.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let trimmed = name.trim();
        if trimmed.eq_ignore_ascii_case("development") {
            Self::Development
        } else if trimmed.eq_ignore_ascii_case("test") {
            Self::Test
        } else {
            Self::Other(trimmed.to_owned())
        }
    }

    /// The fixed connection string for this environment, if it has one.
    #[must_use]
    pub const fn fixed_database_url(&self) -> Option<&'static str> {
        match self {
            Self::Development => Some(DEVELOPMENT_DATABASE_URL),
            Self::Test => Some(TEST_DATABASE_URL),
            Self::Other(_) => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Test => f.write_str("test"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Database settings for the songbook binary.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SONGBOOK")]
pub struct DatabaseSettings {
    /// Environment name.
    #[ortho_config(default = String::from("development"))]
    pub environment: String,
    /// Explicit connection string. Overrides the environment mapping.
    pub database_url: Option<String>,
    /// Maximum pooled connections.
    #[ortho_config(default = DEFAULT_POOL_MAX_SIZE)]
    pub pool_max_size: u32,
    /// Idle connections kept open.
    #[ortho_config(default = DEFAULT_POOL_MIN_IDLE)]
    pub pool_min_idle: u32,
    /// Seconds to wait for a pooled connection.
    #[ortho_config(default = DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub connect_timeout_secs: u64,
}

impl DatabaseSettings {
    /// Load settings from the process environment, files, and `args`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when a source cannot be parsed.
    pub fn load_from_args<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = OsString>,
    {
        Self::load_from_iter(args).map_err(|err| ConfigError::Load {
            message: err.to_string(),
        })
    }

    /// The parsed environment name.
    #[must_use]
    pub fn environment(&self) -> Environment {
        Environment::from_name(&self.environment)
    }

    /// How long to wait for a pooled connection.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Resolve the connection string.
    ///
    /// An explicit `database_url` always wins. Otherwise `development` and
    /// `test` use their fixed URLs and other environments read
    /// [`DATABASE_URL_ENV`] from `env`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingDatabaseUrl`] when nothing supplies a
    /// URL for a non-local environment.
    pub fn resolve_database_url<E: Env>(&self, env: &E) -> Result<String, ConfigError> {
        if let Some(url) = non_blank(self.database_url.clone()) {
            return Ok(url);
        }
        let environment = self.environment();
        if let Some(url) = environment.fixed_database_url() {
            return Ok(url.to_owned());
        }
        non_blank(env.string(DATABASE_URL_ENV)).ok_or_else(|| ConfigError::MissingDatabaseUrl {
            environment: environment.to_string(),
        })
    }

    /// Build the pool configuration for this environment.
    ///
    /// # Errors
    ///
    /// Fails when no URL resolves or the pool sizes are inconsistent.
    pub fn pool_config<E: Env>(&self, env: &E) -> Result<PoolConfig, ConfigError> {
        let max_size = self.pool_max_size;
        let min_idle = self.pool_min_idle;
        if max_size == 0 {
            return Err(ConfigError::InvalidPool {
                message: "pool_max_size must be at least 1".to_owned(),
            });
        }
        if min_idle > max_size {
            return Err(ConfigError::InvalidPool {
                message: format!("pool_min_idle ({min_idle}) exceeds pool_max_size ({max_size})"),
            });
        }
        Ok(PoolConfig::new(self.resolve_database_url(env)?)
            .with_max_size(max_size)
            .with_min_idle(Some(min_idle))
            .with_connection_timeout(self.connect_timeout()))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|url| !url.trim().is_empty())
}
