//! Song entity and its write inputs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit::{AuditTimestamps, Timestamped};
use super::table_binding::{ColumnBinding, TableBinding};

/// Maximum length of any song text column (`VARCHAR(255)`).
pub const MAX_TEXT_LEN: usize = 255;

/// Validation errors returned by song constructors and patches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SongValidationError {
    /// The name is empty or only whitespace.
    EmptyName,
    /// A text value exceeds the column width.
    FieldTooLong {
        /// Offending field.
        field: &'static str,
        /// Maximum length in characters.
        max: usize,
    },
}

impl fmt::Display for SongValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "song name must not be empty"),
            Self::FieldTooLong { field, max } => {
                write!(f, "song {field} must be at most {max} characters")
            }
        }
    }
}

impl std::error::Error for SongValidationError {}

fn checked_name(name: String) -> Result<String, SongValidationError> {
    if name.trim().is_empty() {
        return Err(SongValidationError::EmptyName);
    }
    checked_text("name", name)
}

fn checked_text(field: &'static str, value: String) -> Result<String, SongValidationError> {
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(SongValidationError::FieldTooLong {
            field,
            max: MAX_TEXT_LEN,
        });
    }
    Ok(value)
}

/// Store-assigned song identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(i64);

impl SongId {
    /// Wrap a raw identifier read from the store.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw integer identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Domain fields for a song that has not been stored yet.
///
/// There is no identifier or timestamp here: the store assigns the id and
/// the timestamp hook stamps the row on insert.
///
/// # Examples
///
/// ```
/// use songbook::domain::NewSong;
///
/// let song = NewSong::new("Yesterday")?
///     .with_artist("The Beatles")?
///     .with_album("Help!")?;
/// assert_eq!(song.artist(), Some("The Beatles"));
/// # Ok::<(), songbook::domain::SongValidationError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSong {
    name: String,
    artist: Option<String>,
    album: Option<String>,
}

impl NewSong {
    /// Start a song with only its required name.
    ///
    /// # Errors
    ///
    /// Rejects a blank name or one longer than [`MAX_TEXT_LEN`].
    pub fn new(name: impl Into<String>) -> Result<Self, SongValidationError> {
        Ok(Self {
            name: checked_name(name.into())?,
            artist: None,
            album: None,
        })
    }

    /// Build a song from all three fields at once.
    ///
    /// # Errors
    ///
    /// Fails on the same inputs as [`Self::new`] and the `with_*` setters.
    pub fn from_parts(
        name: String,
        artist: Option<String>,
        album: Option<String>,
    ) -> Result<Self, SongValidationError> {
        Ok(Self {
            name: checked_name(name)?,
            artist: artist
                .map(|value| checked_text("artist", value))
                .transpose()?,
            album: album.map(|value| checked_text("album", value)).transpose()?,
        })
    }

    /// Set the artist.
    ///
    /// # Errors
    ///
    /// Rejects values longer than [`MAX_TEXT_LEN`].
    pub fn with_artist(mut self, artist: impl Into<String>) -> Result<Self, SongValidationError> {
        self.artist = Some(checked_text("artist", artist.into())?);
        Ok(self)
    }

    /// Set the album.
    ///
    /// # Errors
    ///
    /// Rejects values longer than [`MAX_TEXT_LEN`].
    pub fn with_album(mut self, album: impl Into<String>) -> Result<Self, SongValidationError> {
        self.album = Some(checked_text("album", album.into())?);
        Ok(self)
    }

    /// Song name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Artist, when set.
    #[must_use]
    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    /// Album, when set.
    #[must_use]
    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }
}

/// Sparse patch applied by update operations.
///
/// Untouched fields keep their stored value. `artist` and `album` can be
/// cleared back to NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongChanges {
    name: Option<String>,
    artist: Option<Option<String>>,
    album: Option<Option<String>>,
}

impl SongChanges {
    /// An empty patch; applying it only refreshes the modification timestamp.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the name.
    ///
    /// # Errors
    ///
    /// Rejects a blank name or one longer than [`MAX_TEXT_LEN`].
    pub fn with_name(mut self, name: impl Into<String>) -> Result<Self, SongValidationError> {
        self.name = Some(checked_name(name.into())?);
        Ok(self)
    }

    /// Replace the artist.
    ///
    /// # Errors
    ///
    /// Rejects values longer than [`MAX_TEXT_LEN`].
    pub fn with_artist(mut self, artist: impl Into<String>) -> Result<Self, SongValidationError> {
        self.artist = Some(Some(checked_text("artist", artist.into())?));
        Ok(self)
    }

    /// Replace the album.
    ///
    /// # Errors
    ///
    /// Rejects values longer than [`MAX_TEXT_LEN`].
    pub fn with_album(mut self, album: impl Into<String>) -> Result<Self, SongValidationError> {
        self.album = Some(Some(checked_text("album", album.into())?));
        Ok(self)
    }

    /// Set the artist to NULL.
    #[must_use]
    pub fn clear_artist(mut self) -> Self {
        self.artist = Some(None);
        self
    }

    /// Set the album to NULL.
    #[must_use]
    pub fn clear_album(mut self) -> Self {
        self.album = Some(None);
        self
    }

    /// New name, if the patch touches it.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// New artist, if the patch touches it; `Some(None)` clears it.
    #[must_use]
    pub fn artist(&self) -> Option<Option<&str>> {
        self.artist.as_ref().map(Option::as_deref)
    }

    /// New album, if the patch touches it; `Some(None)` clears it.
    #[must_use]
    pub fn album(&self) -> Option<Option<&str>> {
        self.album.as_ref().map(Option::as_deref)
    }

    /// True when no domain field is touched.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.artist.is_none() && self.album.is_none()
    }
}

/// A stored song.
///
/// ## Invariants
/// - `id` was assigned by the store and never changes.
/// - `created_at <= updated_at` (held by [`AuditTimestamps`]).
///
/// Serialises with camelCase keys (`createdAt`, `updatedAt`) mirroring the
/// table columns. Deserialising re-runs the name and length checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(try_from = "RawSong")]
pub struct Song {
    id: SongId,
    name: String,
    artist: Option<String>,
    album: Option<String>,
    #[serde(flatten)]
    timestamps: AuditTimestamps,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSong {
    id: SongId,
    name: String,
    artist: Option<String>,
    album: Option<String>,
    #[serde(flatten)]
    timestamps: AuditTimestamps,
}

impl TryFrom<RawSong> for Song {
    type Error = SongValidationError;

    fn try_from(raw: RawSong) -> Result<Self, Self::Error> {
        let details = NewSong::from_parts(raw.name, raw.artist, raw.album)?;
        Ok(Self::new(raw.id, details, raw.timestamps))
    }
}

impl Song {
    /// Rebuild a stored song from its parts.
    #[must_use]
    pub fn new(id: SongId, details: NewSong, timestamps: AuditTimestamps) -> Self {
        Self {
            id,
            name: details.name,
            artist: details.artist,
            album: details.album,
            timestamps,
        }
    }

    /// Store-assigned identifier.
    #[must_use]
    pub const fn id(&self) -> SongId {
        self.id
    }

    /// Song name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Artist, when set.
    #[must_use]
    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    /// Album, when set.
    #[must_use]
    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    /// When the row was inserted.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.timestamps.created_at()
    }

    /// When the row was last written.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.timestamps.updated_at()
    }

    /// Domain fields without identifier or timestamps.
    #[must_use]
    pub fn details(&self) -> NewSong {
        NewSong {
            name: self.name.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
        }
    }

    /// Apply a patch to the in-memory value. Timestamps are not touched.
    pub fn apply(&mut self, changes: &SongChanges) {
        if let Some(name) = &changes.name {
            self.name.clone_from(name);
        }
        if let Some(artist) = &changes.artist {
            self.artist.clone_from(artist);
        }
        if let Some(album) = &changes.album {
            self.album.clone_from(album);
        }
    }
}

impl Timestamped for Song {
    fn timestamps(&self) -> &AuditTimestamps {
        &self.timestamps
    }

    fn timestamps_mut(&mut self) -> &mut AuditTimestamps {
        &mut self.timestamps
    }
}

impl TableBinding for Song {
    const TABLE: &'static str = "songs";
    const COLUMNS: &'static [ColumnBinding] = &[
        ColumnBinding::new("id", "id", false),
        ColumnBinding::new("name", "name", false),
        ColumnBinding::new("artist", "artist", true),
        ColumnBinding::new("album", "album", true),
        ColumnBinding::new("created_at", "createdAt", false),
        ColumnBinding::new("updated_at", "updatedAt", false),
    ];
}
