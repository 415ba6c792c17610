//! PostgreSQL persistence adapters using Diesel.
//!
//! Row structs (`models`) and table definitions (`schema`) stay private to
//! this module; the domain only sees port implementations and the
//! [`Database`] handle.
//!
//! ```no_run
//! use std::sync::Arc;
//! use mockable::DefaultClock;
//! use songbook::outbound::persistence::{Database, PoolConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let database =
//!     Database::connect(PoolConfig::new("postgres://localhost:5432/songbook_development")).await?;
//! let songs = database.songs(Arc::new(DefaultClock));
//! let _all = songs.select(&songbook::domain::SongQuery::table()).await?;
//! database.close();
//! # Ok(())
//! # }
//! ```

mod database;
mod diesel_schema_inspector;
mod diesel_song_repository;
mod error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;

pub use database::{Database, DatabaseError};
pub use diesel_schema_inspector::DieselSchemaInspector;
pub use diesel_song_repository::DieselSongRepository;
pub use migrations::{MIGRATIONS, MigrationError, apply_migrations, revert_migrations};
pub use pool::{DbPool, PoolConfig, PoolError, PoolStatus};
