//! Embedded schema migrations.
//!
//! Diesel's migration harness is synchronous, so each run opens a plain
//! `PgConnection` on Tokio's blocking pool.

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{info, instrument};

/// Migrations compiled from `backend/migrations`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Failures while applying or reverting migrations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// No connection could be opened.
    #[error("failed to connect for migrations: {message}")]
    Connect {
        /// Connection diagnostic.
        message: String,
    },
    /// A pending migration failed.
    #[error("failed to apply migrations: {message}")]
    Apply {
        /// Harness diagnostic.
        message: String,
    },
    /// The last migration could not be reverted.
    #[error("failed to revert migration: {message}")]
    Revert {
        /// Harness diagnostic.
        message: String,
    },
    /// The blocking task panicked or was cancelled.
    #[error("migration task did not complete: {message}")]
    Task {
        /// Join diagnostic.
        message: String,
    },
}

fn establish(url: &str) -> Result<PgConnection, MigrationError> {
    PgConnection::establish(url).map_err(|err| MigrationError::Connect {
        message: err.to_string(),
    })
}

async fn run_blocking<T, F>(job: F) -> Result<T, MigrationError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, MigrationError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|err| MigrationError::Task {
            message: err.to_string(),
        })?
}

/// Run every pending migration and return the versions applied, oldest
/// first. Already-applied migrations are skipped.
///
/// # Errors
///
/// Returns [`MigrationError`] when the connection or a migration fails.
#[instrument(skip_all)]
pub async fn apply_migrations(database_url: &str) -> Result<Vec<String>, MigrationError> {
    let url = database_url.to_owned();
    let applied = run_blocking(move || {
        let mut conn = establish(&url)?;
        let versions = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| MigrationError::Apply {
                message: err.to_string(),
            })?;
        Ok(versions
            .into_iter()
            .map(|version| version.to_string())
            .collect::<Vec<_>>())
    })
    .await?;
    info!(count = applied.len(), versions = ?applied, "migrations applied");
    Ok(applied)
}

/// Revert the most recently applied migration.
///
/// Returns the reverted version, or `None` when nothing was applied.
///
/// # Errors
///
/// Returns [`MigrationError`] when the connection or the revert fails.
#[instrument(skip_all)]
pub async fn revert_migrations(database_url: &str) -> Result<Option<String>, MigrationError> {
    let url = database_url.to_owned();
    let reverted = run_blocking(move || {
        let mut conn = establish(&url)?;
        let applied = conn
            .applied_migrations()
            .map_err(|err| MigrationError::Revert {
                message: err.to_string(),
            })?;
        if applied.is_empty() {
            return Ok(None);
        }
        let version = conn
            .revert_last_migration(MIGRATIONS)
            .map_err(|err| MigrationError::Revert {
                message: err.to_string(),
            })?;
        Ok(Some(version.to_string()))
    })
    .await?;
    info!(version = ?reverted, "migration revert finished");
    Ok(reverted)
}
