//! Song service: the write-path decorator over [`SongRepository`].
//!
//! Every insert and update passes through the [`TimestampHook`] here before
//! the repository sees it. Instance-only operations are checked here too,
//! before any store call.

use std::sync::Arc;

use mockable::Clock;
use tracing::{debug, instrument};

use crate::domain::audit::TimestampHook;
use crate::domain::ports::{SongRepository, SongRepositoryError};
use crate::domain::{NewSong, Song, SongChanges, SongFilter, SongId, SongQuery};

/// Query façade over songs with timestamping applied to every write.
///
/// # Examples
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use mockable::DefaultClock;
/// # use songbook::domain::{NewSong, SongChanges, SongService};
/// # use songbook::domain::ports::{SongRepository, SongRepositoryError};
/// # async fn example<R: SongRepository>(repo: Arc<R>) -> Result<(), SongRepositoryError> {
/// let songs = SongService::new(repo, Arc::new(DefaultClock));
/// let song = songs
///     .insert_and_fetch(&NewSong::new("Yesterday")?.with_artist("The Beatles")?)
///     .await?;
/// let changes = SongChanges::new().with_artist("The Beatlemen")?;
/// let _updated = songs.update_and_fetch_by_id(song.id(), &changes).await?;
/// # Ok(())
/// # }
/// ```
pub struct SongService<R> {
    repo: Arc<R>,
    hook: TimestampHook,
}

impl<R> Clone for SongService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            hook: self.hook.clone(),
        }
    }
}

impl<R> SongService<R> {
    /// Create a service over `repo`, stamping writes from `clock`.
    #[must_use]
    pub const fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            hook: TimestampHook::new(clock),
        }
    }
}

impl<R> SongService<R>
where
    R: SongRepository,
{
    /// Insert a song and return its identifier.
    ///
    /// # Errors
    ///
    /// Propagates repository failures unchanged.
    #[instrument(skip_all, fields(name = song.name()))]
    pub async fn insert(&self, song: &NewSong) -> Result<SongId, SongRepositoryError> {
        let stamp = self.hook.insert_stamp();
        let id = self.repo.insert(song, &stamp).await?;
        debug!(%id, "song inserted");
        Ok(id)
    }

    /// Insert a song and return the stored row.
    ///
    /// # Errors
    ///
    /// Propagates repository failures unchanged.
    #[instrument(skip_all, fields(name = song.name()))]
    pub async fn insert_and_fetch(&self, song: &NewSong) -> Result<Song, SongRepositoryError> {
        let stamp = self.hook.insert_stamp();
        let stored = self.repo.insert_and_fetch(song, &stamp).await?;
        debug!(id = %stored.id(), "song inserted");
        Ok(stored)
    }

    /// Fetch a song by identifier; `None` when absent.
    ///
    /// # Errors
    ///
    /// Propagates repository failures unchanged.
    pub async fn find_by_id(&self, id: SongId) -> Result<Option<Song>, SongRepositoryError> {
        self.repo.find_by_id(id).await
    }

    /// First song matching `query` by identifier order.
    ///
    /// # Errors
    ///
    /// Propagates repository failures unchanged.
    pub async fn find_one(&self, query: &SongQuery) -> Result<Option<Song>, SongRepositoryError> {
        self.repo.find_one(query.filter()).await
    }

    /// Every song matching `query`; empty when nothing matches.
    ///
    /// # Errors
    ///
    /// Propagates repository failures unchanged.
    pub async fn select(&self, query: &SongQuery) -> Result<Vec<Song>, SongRepositoryError> {
        self.repo.find_where(query.filter()).await
    }

    /// Patch every song matching `query`; returns the number touched.
    ///
    /// # Errors
    ///
    /// Propagates repository failures unchanged.
    #[instrument(skip_all, fields(scope = ?query.scope()))]
    pub async fn update(
        &self,
        query: &SongQuery,
        changes: &SongChanges,
    ) -> Result<usize, SongRepositoryError> {
        let stamp = self.hook.update_stamp();
        let touched = self
            .repo
            .update_where(query.filter(), changes, &stamp)
            .await?;
        debug!(touched, "songs updated");
        Ok(touched)
    }

    /// Patch the song an instance query is bound to and return it.
    ///
    /// Returns `None` when the row no longer exists.
    ///
    /// # Errors
    ///
    /// Returns [`SongRepositoryError::Misuse`] without touching the store
    /// when `query` is table-level. Otherwise propagates repository failures.
    pub async fn update_and_fetch(
        &self,
        query: &SongQuery,
        changes: &SongChanges,
    ) -> Result<Option<Song>, SongRepositoryError> {
        let Some(id) = query.instance_id() else {
            return Err(SongRepositoryError::misuse(
                "update_and_fetch can only be called on an instance query; \
                 use update_and_fetch_by_id or update for table-level queries",
            ));
        };
        self.update_and_fetch_by_id(id, changes).await
    }

    /// Patch one song by identifier and return it; `None` when absent.
    ///
    /// # Errors
    ///
    /// Propagates repository failures unchanged.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn update_and_fetch_by_id(
        &self,
        id: SongId,
        changes: &SongChanges,
    ) -> Result<Option<Song>, SongRepositoryError> {
        let stamp = self.hook.update_stamp();
        let updated = self.repo.update_and_fetch_by_id(id, changes, &stamp).await?;
        debug!(found = updated.is_some(), "song updated");
        Ok(updated)
    }

    /// Write an edited song back and refresh `song` from the stored row.
    ///
    /// The stored modification timestamp ends up later than whatever the
    /// row held, even when `song` is a stale copy. Returns `false`, leaving
    /// `song` untouched, when its row no longer exists.
    ///
    /// # Errors
    ///
    /// Returns [`SongRepositoryError::Timestamp`] when the hook rejects the
    /// write; the store is not called. Otherwise propagates repository
    /// failures, also leaving `song` untouched.
    #[instrument(skip_all, fields(id = %song.id()))]
    pub async fn save(&self, song: &mut Song) -> Result<bool, SongRepositoryError> {
        let mut stamped = song.clone();
        self.hook.before_update(&mut stamped)?;
        let Some(stored) = self.repo.replace(&stamped).await? else {
            debug!("song vanished before save");
            return Ok(false);
        };
        *song = stored;
        Ok(true)
    }

    /// Delete one song by identifier; returns 1 when removed, 0 when absent.
    ///
    /// # Errors
    ///
    /// Propagates repository failures unchanged.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn delete_by_id(&self, id: SongId) -> Result<usize, SongRepositoryError> {
        let filter = SongFilter {
            id: Some(id),
            ..SongFilter::default()
        };
        self.repo.delete_where(&filter).await
    }

    /// Delete every song matching `query`; returns the number removed.
    ///
    /// # Errors
    ///
    /// Propagates repository failures unchanged.
    #[instrument(skip_all, fields(scope = ?query.scope()))]
    pub async fn delete(&self, query: &SongQuery) -> Result<usize, SongRepositoryError> {
        let removed = self.repo.delete_where(query.filter()).await?;
        debug!(removed, "songs deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    //! Service behaviour against a mocked repository.
    use super::*;
    use crate::domain::AuditTimestamps;
    use crate::domain::ports::MockSongRepository;
    use crate::test_support::MutableClock;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use rstest::{fixture, rstest};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .expect("valid instant")
    }

    #[fixture]
    fn clock() -> Arc<MutableClock> {
        Arc::new(MutableClock::new(noon()))
    }

    fn yesterday() -> NewSong {
        NewSong::new("Yesterday")
            .and_then(|song| song.with_artist("The Beatles"))
            .and_then(|song| song.with_album("Help!"))
            .expect("valid song")
    }

    fn stored(at: DateTime<Utc>) -> Song {
        Song::new(SongId::new(1), yesterday(), AuditTimestamps::at(at))
    }

    #[rstest]
    #[tokio::test]
    async fn insert_passes_equal_timestamps(clock: Arc<MutableClock>) {
        let mut repo = MockSongRepository::new();
        repo.expect_insert()
            .withf(|song, stamp| {
                song.name() == "Yesterday"
                    && stamp.created_at() == noon()
                    && stamp.updated_at() == noon()
            })
            .times(1)
            .returning(|_, _| Ok(SongId::new(1)));
        let service = SongService::new(Arc::new(repo), clock);

        let id = service.insert(&yesterday()).await.expect("insert");

        assert_eq!(id, SongId::new(1));
    }

    #[rstest]
    #[tokio::test]
    async fn update_and_fetch_on_table_query_is_misuse(clock: Arc<MutableClock>) {
        let mut repo = MockSongRepository::new();
        repo.expect_update_and_fetch_by_id().never();
        repo.expect_update_where().never();
        let service = SongService::new(Arc::new(repo), clock);
        let changes = SongChanges::new()
            .with_artist("The Beatlemen")
            .expect("valid");

        let error = service
            .update_and_fetch(&SongQuery::table(), &changes)
            .await
            .expect_err("table-level update_and_fetch");

        assert!(error.is_misuse());
        assert!(error.to_string().contains("instance query"));
    }

    #[rstest]
    #[tokio::test]
    async fn update_and_fetch_on_instance_targets_its_row(clock: Arc<MutableClock>) {
        let song = stored(noon() - TimeDelta::hours(1));
        let mut repo = MockSongRepository::new();
        repo.expect_update_and_fetch_by_id()
            .withf(|id, changes, stamp| {
                *id == SongId::new(1)
                    && changes.artist() == Some(Some("The Beatlemen"))
                    && stamp.updated_at() == noon()
            })
            .times(1)
            .returning(|_, _, _| Ok(None));
        let service = SongService::new(Arc::new(repo), clock);
        let changes = SongChanges::new()
            .with_artist("The Beatlemen")
            .expect("valid");

        let result = service
            .update_and_fetch(&SongQuery::instance(&song), &changes)
            .await
            .expect("instance update");

        assert!(result.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn save_stamps_and_writes(clock: Arc<MutableClock>) {
        let created = noon() - TimeDelta::hours(2);
        let mut song = stored(created);
        song.apply(&SongChanges::new().clear_album());
        let mut repo = MockSongRepository::new();
        repo.expect_replace()
            .withf(move |written| {
                written.album().is_none()
                    && written.updated_at() == noon()
                    && written.created_at() == created
            })
            .times(1)
            .returning(|written| Ok(Some(written.clone())));
        let service = SongService::new(Arc::new(repo), clock);

        let written = service.save(&mut song).await.expect("save");

        assert!(written);
        assert_eq!(song.created_at(), created);
        assert_eq!(song.updated_at(), noon());
    }

    #[rstest]
    #[tokio::test]
    async fn save_adopts_the_stored_modification_timestamp(clock: Arc<MutableClock>) {
        let created = noon() - TimeDelta::hours(2);
        let mut song = stored(created);
        let stored_at = noon() + TimeDelta::microseconds(3);
        let mut repo = MockSongRepository::new();
        repo.expect_replace().times(1).returning(move |written| {
            let timestamps =
                AuditTimestamps::new(written.created_at(), stored_at).expect("ordered");
            Ok(Some(Song::new(written.id(), written.details(), timestamps)))
        });
        let service = SongService::new(Arc::new(repo), clock);

        let written = service.save(&mut song).await.expect("save");

        assert!(written);
        assert_eq!(song.updated_at(), stored_at);
    }

    #[rstest]
    #[tokio::test]
    async fn save_of_vanished_row_leaves_value(clock: Arc<MutableClock>) {
        let mut song = stored(noon() - TimeDelta::hours(2));
        let before = song.clone();
        let mut repo = MockSongRepository::new();
        repo.expect_replace().times(1).returning(|_| Ok(None));
        let service = SongService::new(Arc::new(repo), clock);

        let written = service.save(&mut song).await.expect("save");

        assert!(!written);
        assert_eq!(song, before);
    }

    #[rstest]
    #[tokio::test]
    async fn save_with_skewed_clock_never_reaches_store(clock: Arc<MutableClock>) {
        let mut song = stored(noon() + TimeDelta::hours(1));
        let mut repo = MockSongRepository::new();
        repo.expect_replace().never();
        let service = SongService::new(Arc::new(repo), clock);

        let error = service.save(&mut song).await.expect_err("skew");

        assert!(error.is_timestamp());
    }

    #[rstest]
    #[tokio::test]
    async fn delete_by_id_filters_on_identifier(clock: Arc<MutableClock>) {
        let mut repo = MockSongRepository::new();
        repo.expect_delete_where()
            .withf(|filter| filter.id == Some(SongId::new(9)) && filter.name.is_none())
            .times(1)
            .returning(|_| Ok(0));
        let service = SongService::new(Arc::new(repo), clock);

        let removed = service.delete_by_id(SongId::new(9)).await.expect("delete");

        assert_eq!(removed, 0);
    }

    #[rstest]
    #[tokio::test]
    async fn repository_errors_propagate_unchanged(clock: Arc<MutableClock>) {
        let mut repo = MockSongRepository::new();
        repo.expect_find_where()
            .returning(|_| Err(SongRepositoryError::connection("connection refused")));
        let service = SongService::new(Arc::new(repo), clock);

        let error = service
            .select(&SongQuery::table())
            .await
            .expect_err("connection failure");

        assert_eq!(error, SongRepositoryError::connection("connection refused"));
    }
}
