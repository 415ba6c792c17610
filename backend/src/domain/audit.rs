//! Audit timestamps and the hook that stamps them before each write.
//!
//! Entities opt in by implementing [`Timestamped`]; write paths run the
//! [`TimestampHook`] explicitly before handing rows to a repository. Nothing
//! here is inherited or dispatched implicitly: a write that skips the hook is
//! visible at the call site.
//!
//! Readings are truncated to microseconds, matching PostgreSQL `timestamptz`
//! resolution, so an in-memory entity compares equal to its stored row.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, SubsecRound, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize, Serializer};

/// Digits of sub-second precision kept by the store.
const STORE_SUBSEC_DIGITS: u16 = 6;

/// Smallest representable step between two stored timestamps.
const fn store_resolution() -> TimeDelta {
    TimeDelta::microseconds(1)
}

/// Render a timestamp as ISO-8601 with an explicit `+00:00` offset.
///
/// The fixed microsecond width keeps the rendering lexically sortable.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use songbook::domain::audit::to_iso8601;
///
/// let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid");
/// assert_eq!(to_iso8601(&at), "2024-05-01T12:00:00.000000+00:00");
/// ```
#[must_use]
pub fn to_iso8601(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn serialize_iso8601<S>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&to_iso8601(at))
}

/// Errors raised while stamping or constructing audit timestamps.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    /// The clock reads earlier than the record's creation time.
    #[error("clock reading {now} precedes creation timestamp {created_at}")]
    ClockBeforeCreation {
        /// Creation timestamp of the record.
        created_at: DateTime<Utc>,
        /// Offending clock reading.
        now: DateTime<Utc>,
    },
    /// A creation timestamp is later than the modification timestamp.
    #[error("creation timestamp {created_at} is after modification timestamp {updated_at}")]
    InvertedOrder {
        /// Supplied creation timestamp.
        created_at: DateTime<Utc>,
        /// Supplied modification timestamp.
        updated_at: DateTime<Utc>,
    },
}

/// Creation and modification timestamps carried by every persisted entity.
///
/// ## Invariants
/// - `created_at <= updated_at`.
///
/// Serialises as `createdAt` / `updatedAt` ISO-8601 strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(try_from = "RawAuditTimestamps")]
pub struct AuditTimestamps {
    #[serde(serialize_with = "serialize_iso8601")]
    created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_iso8601")]
    updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAuditTimestamps {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RawAuditTimestamps> for AuditTimestamps {
    type Error = TimestampError;

    fn try_from(raw: RawAuditTimestamps) -> Result<Self, Self::Error> {
        Self::new(raw.created_at, raw.updated_at)
    }
}

impl AuditTimestamps {
    /// Validate and construct a timestamp pair.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::InvertedOrder`] when `created_at` is later
    /// than `updated_at`.
    pub fn new(
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, TimestampError> {
        if created_at > updated_at {
            return Err(TimestampError::InvertedOrder {
                created_at,
                updated_at,
            });
        }
        Ok(Self {
            created_at,
            updated_at,
        })
    }

    /// Both timestamps set to the same instant.
    #[must_use]
    pub const fn at(instant: DateTime<Utc>) -> Self {
        Self {
            created_at: instant,
            updated_at: instant,
        }
    }

    /// When the record was first written.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the record was last written.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// ISO-8601 rendering of [`Self::created_at`].
    #[must_use]
    pub fn created_at_iso(&self) -> String {
        to_iso8601(&self.created_at)
    }

    /// ISO-8601 rendering of [`Self::updated_at`].
    #[must_use]
    pub fn updated_at_iso(&self) -> String {
        to_iso8601(&self.updated_at)
    }
}

/// Capability shared by entities whose rows carry audit timestamps.
pub trait Timestamped {
    /// Current audit timestamps.
    fn timestamps(&self) -> &AuditTimestamps;

    /// Mutable access for the hook.
    fn timestamps_mut(&mut self) -> &mut AuditTimestamps;
}

/// Timestamps for a row about to be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertStamp(AuditTimestamps);

impl InsertStamp {
    /// Creation timestamp to write.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }

    /// Modification timestamp to write; equal to the creation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.0.updated_at
    }

    /// The stamped pair.
    #[must_use]
    pub const fn timestamps(&self) -> AuditTimestamps {
        self.0
    }
}

/// Modification timestamp for a row about to be updated.
///
/// Adapters writing this stamp without knowing the stored value must keep the
/// stored modification timestamp strictly increasing, e.g. by writing the
/// greater of this reading and the stored value plus one microsecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateStamp(DateTime<Utc>);

impl UpdateStamp {
    /// Modification timestamp to write.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Stamps audit timestamps from an injected clock.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use mockable::DefaultClock;
/// use songbook::domain::audit::TimestampHook;
///
/// let hook = TimestampHook::new(Arc::new(DefaultClock));
/// let stamp = hook.insert_stamp();
/// assert_eq!(stamp.created_at(), stamp.updated_at());
/// ```
#[derive(Clone)]
pub struct TimestampHook {
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TimestampHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampHook").finish_non_exhaustive()
    }
}

impl TimestampHook {
    /// Create a hook reading time from `clock`.
    #[must_use]
    pub const fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.utc().trunc_subsecs(STORE_SUBSEC_DIGITS)
    }

    /// Timestamps for a new row: both set to the current time.
    #[must_use]
    pub fn insert_stamp(&self) -> InsertStamp {
        InsertStamp(AuditTimestamps::at(self.now()))
    }

    /// Modification timestamp for a row whose stored value is not in hand.
    #[must_use]
    pub fn update_stamp(&self) -> UpdateStamp {
        UpdateStamp(self.now())
    }

    /// Stamp an entity about to be inserted.
    ///
    /// Both timestamps are overwritten, whatever the caller put there.
    pub fn before_insert<T>(&self, entity: &mut T)
    where
        T: Timestamped + ?Sized,
    {
        *entity.timestamps_mut() = self.insert_stamp().timestamps();
    }

    /// Stamp an entity about to be updated.
    ///
    /// The creation timestamp is left alone. When the clock has not moved
    /// past the previous modification timestamp the new value is one store
    /// tick later, so the modification timestamp always increases.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::ClockBeforeCreation`] when the clock reads
    /// earlier than the entity's creation timestamp. The entity is left
    /// untouched.
    pub fn before_update<T>(&self, entity: &mut T) -> Result<(), TimestampError>
    where
        T: Timestamped + ?Sized,
    {
        let now = self.now();
        let current = *entity.timestamps();
        if now < current.created_at {
            return Err(TimestampError::ClockBeforeCreation {
                created_at: current.created_at,
                now,
            });
        }

        let next = if now > current.updated_at {
            now
        } else {
            current.updated_at + store_resolution()
        };
        entity.timestamps_mut().updated_at = next;
        Ok(())
    }
}
