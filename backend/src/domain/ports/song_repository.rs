//! Port for song persistence.
//!
//! Implementations receive writes that have already been stamped by the
//! [`TimestampHook`](crate::domain::audit::TimestampHook); they never read the
//! clock themselves. Lookups that find nothing return `None`, empty vectors,
//! or a zero row count rather than an error.

use async_trait::async_trait;

use crate::domain::audit::{InsertStamp, TimestampError, UpdateStamp};
use crate::domain::{NewSong, Song, SongChanges, SongFilter, SongId, SongValidationError};

use super::define_port_error;

define_port_error! {
    /// Errors raised by song repository adapters and the song service.
    pub enum SongRepositoryError {
        /// The store is unreachable or no connection could be checked out.
        Connection { message: String } =>
            "song repository connection failed: {message}",
        /// A table constraint rejected the write.
        Constraint { message: String } =>
            "song constraint violated: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "song repository query failed: {message}",
        /// An operation was invoked in a context that does not support it.
        Misuse { message: String } =>
            "invalid song repository usage: {message}",
        /// Input failed domain validation.
        Validation { message: String } =>
            "invalid song input: {message}",
        /// The timestamp hook refused to stamp the write.
        Timestamp { message: String } =>
            "audit timestamp rejected: {message}",
    }
}

impl From<SongValidationError> for SongRepositoryError {
    fn from(error: SongValidationError) -> Self {
        Self::validation(error.to_string())
    }
}

impl From<TimestampError> for SongRepositoryError {
    fn from(error: TimestampError) -> Self {
        Self::timestamp(error.to_string())
    }
}

/// Port for song storage and retrieval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SongRepository: Send + Sync {
    /// Insert a row and return its store-assigned identifier.
    async fn insert(
        &self,
        song: &NewSong,
        stamp: &InsertStamp,
    ) -> Result<SongId, SongRepositoryError>;

    /// Insert a row and return it as stored, store defaults included.
    async fn insert_and_fetch(
        &self,
        song: &NewSong,
        stamp: &InsertStamp,
    ) -> Result<Song, SongRepositoryError>;

    /// Fetch one row by identifier.
    async fn find_by_id(&self, id: SongId) -> Result<Option<Song>, SongRepositoryError>;

    /// Fetch the matching row with the lowest identifier.
    async fn find_one(&self, filter: &SongFilter) -> Result<Option<Song>, SongRepositoryError>;

    /// Fetch every matching row, ordered by identifier.
    async fn find_where(&self, filter: &SongFilter) -> Result<Vec<Song>, SongRepositoryError>;

    /// Patch every matching row and return how many were touched.
    ///
    /// The stored modification timestamp must strictly increase for each
    /// touched row, even when `stamp` is not later than the stored value.
    async fn update_where(
        &self,
        filter: &SongFilter,
        changes: &SongChanges,
        stamp: &UpdateStamp,
    ) -> Result<usize, SongRepositoryError>;

    /// Patch one row and return it as stored, or `None` when absent.
    async fn update_and_fetch_by_id(
        &self,
        id: SongId,
        changes: &SongChanges,
        stamp: &UpdateStamp,
    ) -> Result<Option<Song>, SongRepositoryError>;

    /// Overwrite the domain fields and modification timestamp of the row
    /// behind `song` and return the row as stored, or `None` when absent.
    ///
    /// The creation timestamp is never written. As with
    /// [`Self::update_where`], the stored modification timestamp must
    /// strictly increase even when `song` carries a stale value.
    async fn replace(&self, song: &Song) -> Result<Option<Song>, SongRepositoryError>;

    /// Delete every matching row and return how many were removed.
    async fn delete_where(&self, filter: &SongFilter) -> Result<usize, SongRepositoryError>;
}
