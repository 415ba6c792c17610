//! Explicit store handle.
//!
//! A [`Database`] is acquired once at process start, passed to whatever
//! needs songs, and closed at shutdown. There is no global connection.
//! Closing releases the pool for every service built from the handle.

use std::sync::Arc;

use mockable::Clock;
use tracing::{info, instrument};

use crate::domain::{BindingCheckError, Song, SongService, verify_binding};

use super::diesel_schema_inspector::DieselSchemaInspector;
use super::diesel_song_repository::DieselSongRepository;
use super::pool::{DbPool, PoolConfig, PoolError, PoolStatus};

/// Failures while opening a [`Database`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatabaseError {
    /// The pool could not be opened.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// The live schema does not match the `songs` binding.
    #[error("table binding check failed: {0}")]
    Binding(#[from] BindingCheckError),
}

/// Pooled connection to the songs store.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open the pool and check the `songs` binding against the live schema.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Pool`] when the store is unreachable and
    /// [`DatabaseError::Binding`] when the schema has drifted.
    #[instrument(skip_all, fields(max_size = config.max_size()))]
    pub async fn connect(config: PoolConfig) -> Result<Self, DatabaseError> {
        let database = Self::connect_unchecked(config).await?;
        verify_binding::<Song, _>(&database.schema_inspector()).await?;
        Ok(database)
    }

    /// Open the pool without validating bindings.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError`] when the pool cannot be built.
    pub async fn connect_unchecked(config: PoolConfig) -> Result<Self, PoolError> {
        let pool = DbPool::new(config).await?;
        info!(status = ?pool.status(), "database pool ready");
        Ok(Self { pool })
    }

    /// Song façade over this store, stamping writes from `clock`.
    #[must_use]
    pub fn songs(&self, clock: Arc<dyn Clock>) -> SongService<DieselSongRepository> {
        SongService::new(
            Arc::new(DieselSongRepository::new(self.pool.clone())),
            clock,
        )
    }

    /// Live-schema reader over this store.
    #[must_use]
    pub fn schema_inspector(&self) -> DieselSchemaInspector {
        DieselSchemaInspector::new(self.pool.clone())
    }

    /// The shared connection pool.
    #[must_use]
    pub const fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Current pool occupancy.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        self.pool.status()
    }

    /// Release the store.
    ///
    /// Services and inspectors built from this handle fail with a
    /// connection error afterwards, and pooled connections close once any
    /// in-flight checkout is returned.
    pub fn close(self) {
        let status = self.pool.status();
        if self.pool.close() {
            info!(?status, "database closed");
        }
    }
}
