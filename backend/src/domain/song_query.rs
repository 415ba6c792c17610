//! Chainable song queries and the criteria they carry to repositories.

use super::song::{Song, SongId};

/// Match applied to a nullable text column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NullableMatch {
    /// Column equals the value.
    Equals(String),
    /// Column is NULL.
    IsNull,
}

impl NullableMatch {
    /// The value to compare with, `None` meaning NULL.
    #[must_use]
    pub fn as_value(&self) -> Option<&str> {
        match self {
            Self::Equals(value) => Some(value),
            Self::IsNull => None,
        }
    }

    fn matches(&self, candidate: Option<&str>) -> bool {
        self.as_value() == candidate
    }
}

/// Equality criteria over song columns. Empty criteria match every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongFilter {
    /// Exact identifier.
    pub id: Option<SongId>,
    /// Exact name.
    pub name: Option<String>,
    /// Artist value or NULL.
    pub artist: Option<NullableMatch>,
    /// Album value or NULL.
    pub album: Option<NullableMatch>,
}

impl SongFilter {
    /// True when `song` satisfies every criterion.
    #[must_use]
    pub fn matches(&self, song: &Song) -> bool {
        self.id.is_none_or(|id| id == song.id())
            && self.name.as_deref().is_none_or(|name| name == song.name())
            && self
                .artist
                .as_ref()
                .is_none_or(|artist| artist.matches(song.artist()))
            && self
                .album
                .as_ref()
                .is_none_or(|album| album.matches(song.album()))
    }

    /// True when no criterion is set.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        *self == Self::default()
    }
}

/// Whether a query addresses the whole table or one fetched song.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryScope {
    /// Class-level context: the `songs` table as a whole.
    Table,
    /// Instance context: the row behind one song value.
    Instance(SongId),
}

/// A chainable query over songs.
///
/// # Examples
///
/// ```
/// use songbook::domain::{QueryScope, SongQuery};
///
/// let query = SongQuery::table().artist("The Beatles").album_is_null();
/// assert_eq!(query.scope(), QueryScope::Table);
/// assert_eq!(query.filter().artist.as_ref().and_then(|m| m.as_value()), Some("The Beatles"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongQuery {
    scope: QueryScope,
    filter: SongFilter,
}

impl SongQuery {
    /// Query the whole table.
    #[must_use]
    pub fn table() -> Self {
        Self {
            scope: QueryScope::Table,
            filter: SongFilter::default(),
        }
    }

    /// Query the row behind `song`.
    #[must_use]
    pub fn instance(song: &Song) -> Self {
        let id = song.id();
        Self {
            scope: QueryScope::Instance(id),
            filter: SongFilter {
                id: Some(id),
                ..SongFilter::default()
            },
        }
    }

    /// Restrict to one identifier.
    #[must_use]
    pub fn id(mut self, id: SongId) -> Self {
        self.filter.id = Some(id);
        self
    }

    /// Restrict to an exact name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.filter.name = Some(name.into());
        self
    }

    /// Restrict to an exact artist.
    #[must_use]
    pub fn artist(mut self, artist: impl Into<String>) -> Self {
        self.filter.artist = Some(NullableMatch::Equals(artist.into()));
        self
    }

    /// Restrict to songs without an artist.
    #[must_use]
    pub fn artist_is_null(mut self) -> Self {
        self.filter.artist = Some(NullableMatch::IsNull);
        self
    }

    /// Restrict to an exact album.
    #[must_use]
    pub fn album(mut self, album: impl Into<String>) -> Self {
        self.filter.album = Some(NullableMatch::Equals(album.into()));
        self
    }

    /// Restrict to songs without an album.
    #[must_use]
    pub fn album_is_null(mut self) -> Self {
        self.filter.album = Some(NullableMatch::IsNull);
        self
    }

    /// Table-level or bound to one song.
    #[must_use]
    pub const fn scope(&self) -> QueryScope {
        self.scope
    }

    /// Criteria handed to the repository.
    #[must_use]
    pub const fn filter(&self) -> &SongFilter {
        &self.filter
    }

    /// The instance this query is bound to, if any.
    #[must_use]
    pub const fn instance_id(&self) -> Option<SongId> {
        match self.scope {
            QueryScope::Instance(id) => Some(id),
            QueryScope::Table => None,
        }
    }
}
