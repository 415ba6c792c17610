//! Test utilities for the songbook crate.
//!
//! Shared by unit tests in `src/` and integration tests in `tests/`. Only
//! compiled for tests or with the `test-support` feature.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::audit::{InsertStamp, UpdateStamp};
use crate::domain::ports::{SongRepository, SongRepositoryError};
use crate::domain::{AuditTimestamps, NewSong, Song, SongChanges, SongFilter, SongId};

/// Clock that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Frozen at `now` until moved.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by `step`.
    ///
    /// # Panics
    ///
    /// Panics when `step` does not fit a [`TimeDelta`] or the clock mutex is
    /// poisoned.
    pub fn advance(&self, step: Duration) {
        let delta = TimeDelta::from_std(step).unwrap_or_else(|error| {
            panic!("failed to convert Duration to TimeDelta: {error}; step={step:?}")
        });
        *self.lock_clock() += delta;
    }

    /// Jump to `now`, backwards included.
    ///
    /// # Panics
    ///
    /// Panics when the clock mutex is poisoned.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock_clock() = now;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.0.lock().unwrap_or_else(|_| panic!("clock mutex poisoned"))
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// In-memory [`SongRepository`] with the same observable semantics as the
/// Diesel adapter: sequential ids, strictly increasing modification
/// timestamps, physical deletes.
#[derive(Default)]
pub struct InMemorySongRepository {
    state: Mutex<InMemoryState>,
}

#[derive(Default)]
struct InMemoryState {
    next_id: i64,
    rows: BTreeMap<SongId, Song>,
}

impl InMemorySongRepository {
    /// Number of stored rows.
    ///
    /// # Panics
    ///
    /// Panics when the state mutex is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_state().rows.len()
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_state(&self) -> MutexGuard<'_, InMemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|_| panic!("repository mutex poisoned"))
    }
}

/// Later of `stamp` and one microsecond past the stored value, as the
/// Diesel adapter computes with `GREATEST`.
fn bumped(stored: &Song, stamp: DateTime<Utc>) -> Result<AuditTimestamps, SongRepositoryError> {
    let floor = stored.updated_at() + TimeDelta::microseconds(1);
    AuditTimestamps::new(stored.created_at(), stamp.max(floor))
        .map_err(|error| SongRepositoryError::constraint(error.to_string()))
}

fn patched(
    song: &Song,
    changes: &SongChanges,
    stamp: &UpdateStamp,
) -> Result<Song, SongRepositoryError> {
    let mut next = song.clone();
    next.apply(changes);
    Ok(Song::new(
        next.id(),
        next.details(),
        bumped(song, stamp.updated_at())?,
    ))
}

#[async_trait]
impl SongRepository for InMemorySongRepository {
    async fn insert(
        &self,
        song: &NewSong,
        stamp: &InsertStamp,
    ) -> Result<SongId, SongRepositoryError> {
        self.insert_and_fetch(song, stamp).await.map(|row| row.id())
    }

    async fn insert_and_fetch(
        &self,
        song: &NewSong,
        stamp: &InsertStamp,
    ) -> Result<Song, SongRepositoryError> {
        let mut state = self.lock_state();
        state.next_id += 1;
        let id = SongId::new(state.next_id);
        let row = Song::new(id, song.clone(), stamp.timestamps());
        state.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: SongId) -> Result<Option<Song>, SongRepositoryError> {
        Ok(self.lock_state().rows.get(&id).cloned())
    }

    async fn find_one(&self, filter: &SongFilter) -> Result<Option<Song>, SongRepositoryError> {
        Ok(self
            .lock_state()
            .rows
            .values()
            .find(|song| filter.matches(song))
            .cloned())
    }

    async fn find_where(&self, filter: &SongFilter) -> Result<Vec<Song>, SongRepositoryError> {
        Ok(self
            .lock_state()
            .rows
            .values()
            .filter(|song| filter.matches(song))
            .cloned()
            .collect())
    }

    async fn update_where(
        &self,
        filter: &SongFilter,
        changes: &SongChanges,
        stamp: &UpdateStamp,
    ) -> Result<usize, SongRepositoryError> {
        let mut state = self.lock_state();
        let mut touched = 0;
        for song in state.rows.values_mut().filter(|song| filter.matches(song)) {
            *song = patched(song, changes, stamp)?;
            touched += 1;
        }
        Ok(touched)
    }

    async fn update_and_fetch_by_id(
        &self,
        id: SongId,
        changes: &SongChanges,
        stamp: &UpdateStamp,
    ) -> Result<Option<Song>, SongRepositoryError> {
        let mut state = self.lock_state();
        let Some(song) = state.rows.get_mut(&id) else {
            return Ok(None);
        };
        *song = patched(song, changes, stamp)?;
        Ok(Some(song.clone()))
    }

    async fn replace(&self, song: &Song) -> Result<Option<Song>, SongRepositoryError> {
        let mut state = self.lock_state();
        let Some(stored) = state.rows.get_mut(&song.id()) else {
            return Ok(None);
        };
        *stored = Song::new(song.id(), song.details(), bumped(stored, song.updated_at())?);
        Ok(Some(stored.clone()))
    }

    async fn delete_where(&self, filter: &SongFilter) -> Result<usize, SongRepositoryError> {
        let mut state = self.lock_state();
        let before = state.rows.len();
        state.rows.retain(|_, song| !filter.matches(song));
        Ok(before - state.rows.len())
    }
}
