//! PostgreSQL-backed `SongRepository` implementation using Diesel.
//!
//! Filters become a single boxed SQL predicate shared by reads, updates and
//! deletes. Updates push the modification timestamp through `GREATEST` so
//! it strictly increases even when the caller's clock lags the stored value.

use async_trait::async_trait;
use diesel::dsl::IntervalDsl;
use diesel::expression::{AsExpression, BoxableExpression};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Timestamptz};
use diesel_async::RunQueryDsl;
use tracing::{debug, instrument};

use crate::domain::audit::{InsertStamp, UpdateStamp};
use crate::domain::ports::{SongRepository, SongRepositoryError};
use crate::domain::{NewSong, Song, SongChanges, SongFilter, SongId};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewSongRow, SongChangeset, SongReplacement, SongRow};
use super::pool::DbPool;
use super::schema::songs;

diesel::define_sql_function! {
    /// PostgreSQL `GREATEST` over two timestamps.
    fn greatest(a: Timestamptz, b: Timestamptz) -> Timestamptz;
}

type SongPredicate<'a> = Box<dyn BoxableExpression<songs::table, Pg, SqlType = Bool> + 'a>;

/// Translate filter criteria into one SQL predicate; no criteria means TRUE.
fn predicate(filter: &SongFilter) -> SongPredicate<'_> {
    let mut clause: SongPredicate<'_> = Box::new(AsExpression::<Bool>::as_expression(true));
    if let Some(id) = filter.id {
        clause = Box::new(clause.and(songs::id.eq(id.get())));
    }
    if let Some(name) = filter.name.as_deref() {
        clause = Box::new(clause.and(songs::name.eq(name)));
    }
    if let Some(artist) = &filter.artist {
        clause = Box::new(clause.and(songs::artist.is_not_distinct_from(artist.as_value())));
    }
    if let Some(album) = &filter.album {
        clause = Box::new(clause.and(songs::album.is_not_distinct_from(album.as_value())));
    }
    clause
}

fn to_song(row: SongRow) -> Result<Song, SongRepositoryError> {
    row.into_song().map_err(SongRepositoryError::query)
}

/// Diesel-backed implementation of the `SongRepository` port.
#[derive(Clone)]
pub struct DieselSongRepository {
    pool: DbPool,
}

impl DieselSongRepository {
    /// Create a repository checking connections out of `pool`.
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SongRepository for DieselSongRepository {
    #[instrument(skip_all)]
    async fn insert(
        &self,
        song: &NewSong,
        stamp: &InsertStamp,
    ) -> Result<SongId, SongRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let id: i64 = diesel::insert_into(songs::table)
            .values(NewSongRow::new(song, stamp.timestamps()))
            .returning(songs::id)
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        debug!(id, "inserted song row");
        Ok(SongId::new(id))
    }

    #[instrument(skip_all)]
    async fn insert_and_fetch(
        &self,
        song: &NewSong,
        stamp: &InsertStamp,
    ) -> Result<Song, SongRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: SongRow = diesel::insert_into(songs::table)
            .values(NewSongRow::new(song, stamp.timestamps()))
            .returning(SongRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        debug!(id = row.id, "inserted song row");
        to_song(row)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn find_by_id(&self, id: SongId) -> Result<Option<Song>, SongRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = songs::table
            .find(id.get())
            .select(SongRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_song).transpose()
    }

    #[instrument(skip_all)]
    async fn find_one(&self, filter: &SongFilter) -> Result<Option<Song>, SongRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = songs::table
            .filter(predicate(filter))
            .order(songs::id.asc())
            .select(SongRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_song).transpose()
    }

    #[instrument(skip_all)]
    async fn find_where(&self, filter: &SongFilter) -> Result<Vec<Song>, SongRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<SongRow> = songs::table
            .filter(predicate(filter))
            .order(songs::id.asc())
            .select(SongRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        debug!(count = rows.len(), "loaded song rows");
        rows.into_iter().map(to_song).collect()
    }

    #[instrument(skip_all)]
    async fn update_where(
        &self,
        filter: &SongFilter,
        changes: &SongChanges,
        stamp: &UpdateStamp,
    ) -> Result<usize, SongRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let bumped = greatest(stamp.updated_at(), songs::updated_at + 1_i64.microseconds());
        let touched = diesel::update(songs::table.filter(predicate(filter)))
            .set((SongChangeset::from(changes), songs::updated_at.eq(bumped)))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        debug!(touched, "updated song rows");
        Ok(touched)
    }

    #[instrument(skip(self, changes, stamp), fields(id = %id))]
    async fn update_and_fetch_by_id(
        &self,
        id: SongId,
        changes: &SongChanges,
        stamp: &UpdateStamp,
    ) -> Result<Option<Song>, SongRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let bumped = greatest(stamp.updated_at(), songs::updated_at + 1_i64.microseconds());
        let row = diesel::update(songs::table.find(id.get()))
            .set((SongChangeset::from(changes), songs::updated_at.eq(bumped)))
            .returning(SongRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_song).transpose()
    }

    #[instrument(skip_all, fields(id = %song.id()))]
    async fn replace(&self, song: &Song) -> Result<Option<Song>, SongRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let bumped = greatest(song.updated_at(), songs::updated_at + 1_i64.microseconds());
        let row = diesel::update(songs::table.find(song.id().get()))
            .set((SongReplacement::from(song), songs::updated_at.eq(bumped)))
            .returning(SongRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_song).transpose()
    }

    #[instrument(skip_all)]
    async fn delete_where(&self, filter: &SongFilter) -> Result<usize, SongRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let removed = diesel::delete(songs::table.filter(predicate(filter)))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        debug!(removed, "deleted song rows");
        Ok(removed)
    }
}
