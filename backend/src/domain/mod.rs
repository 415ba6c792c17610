//! Domain primitives, ports, and services.
//!
//! Purpose: define the song entity, the audit timestamp hook every write
//! passes through, explicit table bindings, and the query façade over the
//! repository port. Nothing here touches Diesel; adapters live in
//! `crate::outbound`.
//!
//! Public surface:
//! - Song / NewSong / SongChanges: the entity and its write inputs.
//! - AuditTimestamps / TimestampHook: creation and modification stamping.
//! - TableBinding: table name and field-to-column map per entity.
//! - SongQuery / SongService: chainable queries and the stamped façade.

pub mod audit;
pub mod ports;
pub mod schema_check;
pub mod song;
pub mod song_query;
pub mod song_service;
pub mod table_binding;

pub use self::audit::{AuditTimestamps, TimestampError, TimestampHook, Timestamped};
pub use self::schema_check::{BindingCheckError, verify_binding};
pub use self::song::{MAX_TEXT_LEN, NewSong, Song, SongChanges, SongId, SongValidationError};
pub use self::song_query::{NullableMatch, QueryScope, SongFilter, SongQuery};
pub use self::song_service::SongService;
pub use self::table_binding::{
    ColumnBinding, LiveColumn, SchemaDriftError, TableBinding, validate_binding,
};
