//! Diesel table definitions for the PostgreSQL schema.
//!
//! These must match `backend/migrations` exactly. The audit columns keep
//! their camelCase names in SQL and are exposed as snake_case in Rust.

diesel::table! {
    /// Stored songs.
    songs (id) {
        /// Store-assigned identifier (`BIGSERIAL`).
        id -> Int8,
        /// Song title (max 255 characters).
        name -> Varchar,
        artist -> Nullable<Varchar>,
        album -> Nullable<Varchar>,
        /// Creation timestamp, written once by the timestamp hook.
        #[sql_name = "createdAt"]
        created_at -> Timestamptz,
        /// Last modification timestamp.
        #[sql_name = "updatedAt"]
        updated_at -> Timestamptz,
    }
}
