//! Internal Diesel row structs for the `songs` table.
//!
//! These never leave the persistence layer; adapters convert them into
//! domain values.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::{AuditTimestamps, NewSong, Song, SongChanges, SongId};

use super::schema::songs;

/// Row struct for reading from the songs table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = songs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SongRow {
    pub id: i64,
    pub name: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SongRow {
    /// Convert into a domain song, re-checking the entity invariants.
    ///
    /// Returns a description of the first violated invariant.
    pub(crate) fn into_song(self) -> Result<Song, String> {
        let id = self.id;
        let invalid = |reason: String| format!("stored song {id} is invalid: {reason}");

        let details = NewSong::from_parts(self.name, self.artist, self.album)
            .map_err(|err| invalid(err.to_string()))?;
        let timestamps = AuditTimestamps::new(self.created_at, self.updated_at)
            .map_err(|err| invalid(err.to_string()))?;

        Ok(Song::new(SongId::new(id), details, timestamps))
    }
}

/// Insertable struct for new song rows; both audit columns are explicit.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = songs)]
pub(crate) struct NewSongRow<'a> {
    pub name: &'a str,
    pub artist: Option<&'a str>,
    pub album: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> NewSongRow<'a> {
    pub(crate) fn new(song: &'a NewSong, timestamps: AuditTimestamps) -> Self {
        Self {
            name: song.name(),
            artist: song.artist(),
            album: song.album(),
            created_at: timestamps.created_at(),
            updated_at: timestamps.updated_at(),
        }
    }
}

/// Sparse changeset: `None` leaves a column alone, `Some(None)` writes NULL.
///
/// The modification timestamp is set separately so the adapter can keep it
/// strictly increasing in SQL.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = songs)]
pub(crate) struct SongChangeset<'a> {
    pub name: Option<&'a str>,
    pub artist: Option<Option<&'a str>>,
    pub album: Option<Option<&'a str>>,
}

impl<'a> From<&'a SongChanges> for SongChangeset<'a> {
    fn from(changes: &'a SongChanges) -> Self {
        Self {
            name: changes.name(),
            artist: changes.artist(),
            album: changes.album(),
        }
    }
}

/// Full overwrite of the domain columns used by `save`.
///
/// Like [`SongChangeset`], the modification timestamp is set separately.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = songs)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct SongReplacement<'a> {
    pub name: &'a str,
    pub artist: Option<&'a str>,
    pub album: Option<&'a str>,
}

impl<'a> From<&'a Song> for SongReplacement<'a> {
    fn from(song: &'a Song) -> Self {
        Self {
            name: song.name(),
            artist: song.artist(),
            album: song.album(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .expect("valid instant")
    }

    fn row(name: &str, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> SongRow {
        SongRow {
            id: 3,
            name: name.to_owned(),
            artist: Some("The Beatles".to_owned()),
            album: None,
            created_at,
            updated_at,
        }
    }

    #[rstest]
    fn valid_rows_convert(instant: DateTime<Utc>) {
        let song = row("Yesterday", instant, instant)
            .into_song()
            .expect("valid row");

        assert_eq!(song.id(), SongId::new(3));
        assert_eq!(song.artist(), Some("The Beatles"));
        assert_eq!(song.album(), None);
        assert_eq!(song.created_at(), song.updated_at());
    }

    #[rstest]
    fn blank_stored_name_is_reported(instant: DateTime<Utc>) {
        let error = row("", instant, instant)
            .into_song()
            .expect_err("blank name");

        assert!(error.starts_with("stored song 3 is invalid"), "{error}");
    }

    #[rstest]
    fn inverted_stored_timestamps_are_reported(instant: DateTime<Utc>) {
        let earlier = instant - chrono::TimeDelta::seconds(1);
        let error = row("Yesterday", instant, earlier)
            .into_song()
            .expect_err("inverted timestamps");

        assert!(error.contains("stored song 3"), "{error}");
    }

    #[rstest]
    fn changeset_mirrors_patch() {
        let changes = SongChanges::new()
            .with_artist("The Beatlemen")
            .expect("valid artist")
            .clear_album();
        let changeset = SongChangeset::from(&changes);

        assert_eq!(changeset.name, None);
        assert_eq!(changeset.artist, Some(Some("The Beatlemen")));
        assert_eq!(changeset.album, Some(None));
    }
}
