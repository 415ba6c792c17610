//! Connection pool behind the [`Database`](super::Database) handle.
//!
//! Wraps `diesel-async`'s `bb8` integration. Checkouts are async and bounded
//! by the configured timeout; failures surface as [`PoolError`].

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};

/// Errors raised while building the pool or checking out a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// No connection became available within the timeout.
    #[error("failed to get connection from pool: {message}")]
    Checkout {
        /// Diagnostic from the pool.
        message: String,
    },

    /// The pool could not be constructed.
    #[error("failed to build connection pool: {message}")]
    Build {
        /// Diagnostic from the pool.
        message: String,
    },

    /// The pool was released by [`DbPool::close`].
    #[error("connection pool is closed")]
    Closed,
}

impl PoolError {
    /// Checkout failure with `message`.
    #[must_use]
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }

    /// Build failure with `message`.
    #[must_use]
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    /// The underlying message, whichever variant carries it.
    #[must_use]
    pub fn into_message(self) -> String {
        match self {
            Self::Checkout { message } | Self::Build { message } => message,
            Self::Closed => Self::Closed.to_string(),
        }
    }
}

/// Pool sizing and connection string.
///
/// ```
/// use std::time::Duration;
/// use songbook::outbound::persistence::PoolConfig;
///
/// let config = PoolConfig::new("postgres://localhost:5432/songbook_test")
///     .with_max_size(4)
///     .with_min_idle(None)
///     .with_connection_timeout(Duration::from_secs(5));
/// assert_eq!(config.max_size(), 4);
/// ```
#[derive(Clone)]
pub struct PoolConfig {
    database_url: String,
    max_size: u32,
    min_idle: Option<u32>,
    connection_timeout: Duration,
}

impl PoolConfig {
    /// Defaults: 10 connections, 2 idle, 30 second checkout timeout.
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: 10,
            min_idle: Some(2),
            connection_timeout: Duration::from_secs(30),
        }
    }

    /// Maximum number of pooled connections.
    #[must_use]
    pub const fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Idle connections to keep open; `None` opens them on demand.
    #[must_use]
    pub const fn with_min_idle(mut self, min_idle: Option<u32>) -> Self {
        self.min_idle = min_idle;
        self
    }

    /// How long a checkout may wait.
    #[must_use]
    pub const fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Connection string.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Maximum number of pooled connections.
    #[must_use]
    pub const fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Idle connections kept open.
    #[must_use]
    pub const fn min_idle(&self) -> Option<u32> {
        self.min_idle
    }

    /// How long a checkout may wait.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }
}

// Connection strings may carry credentials.
impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("database_url", &"<redacted>")
            .field("max_size", &self.max_size)
            .field("min_idle", &self.min_idle)
            .field("connection_timeout", &self.connection_timeout)
            .finish()
    }
}

/// Point-in-time pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Open connections, idle or checked out.
    pub connections: u32,
    /// Open connections not checked out.
    pub idle: u32,
}

/// Async PostgreSQL connection pool.
///
/// Clones share one underlying pool. [`Self::close`] releases it for every
/// clone at once; later checkouts fail with [`PoolError::Closed`] and the
/// connections close as soon as in-flight checkouts are returned.
#[derive(Clone)]
pub struct DbPool {
    inner: Arc<Mutex<Option<Pool<AsyncPgConnection>>>>,
}

impl DbPool {
    /// Build the pool, opening `min_idle` connections up front.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Build`] when the pool cannot be constructed.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(config.min_idle)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;

        Ok(Self::from_pool(pool))
    }

    fn from_pool(pool: Pool<AsyncPgConnection>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(pool))),
        }
    }

    fn live(&self) -> Option<Pool<AsyncPgConnection>> {
        self.inner.lock().ok().and_then(|slot| slot.clone())
    }

    /// Check out a connection.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Closed`] after [`Self::close`], and
    /// [`PoolError::Checkout`] when no connection is available within the
    /// configured timeout.
    pub async fn get(&self) -> Result<PooledConnection<'static, AsyncPgConnection>, PoolError> {
        let pool = self.live().ok_or(PoolError::Closed)?;
        pool.get_owned()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }

    /// Release the pool for every clone. Returns `false` when it was
    /// already closed.
    #[must_use]
    pub fn close(&self) -> bool {
        self.inner
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .is_some()
    }

    /// True once [`Self::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.live().is_none()
    }

    /// Current occupancy; all zero once closed.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        self.live().map_or(
            PoolStatus {
                connections: 0,
                idle: 0,
            },
            |pool| {
                let state = pool.state();
                PoolStatus {
                    connections: state.connections,
                    idle: state.idle_connections,
                }
            },
        )
    }
}

impl fmt::Debug for DbPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbPool")
            .field("status", &self.status())
            .finish()
    }
}
