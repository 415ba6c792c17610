//! Domain ports for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod schema_inspector;
mod song_repository;

#[cfg(test)]
pub use schema_inspector::MockSchemaInspector;
pub use schema_inspector::{SchemaInspector, SchemaInspectorError};
#[cfg(test)]
pub use song_repository::MockSongRepository;
pub use song_repository::{SongRepository, SongRepositoryError};
