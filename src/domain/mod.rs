//! Domain types for watch tracking with strong typing.
//!
//! Newtype wrappers keep the external catalog identifier, the internal store
//! identifier, and user identifiers from being mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of a title in the external media catalog.
///
/// Distinct from [`TitleId`], which is the local store's primary key.
///
/// # Examples
///
/// ```rust
/// use watchnext::domain::TmdbId;
///
/// let id = TmdbId::new(27205);
/// assert_eq!(id.value(), 27205);
/// assert_eq!(id.to_string(), "27205");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TmdbId(i32);

impl TmdbId {
    /// Creates a new `TmdbId` from a raw i32 value.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if `id` is negative. Production code should validate
    /// before construction.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "TmdbId should be non-negative");
        Self(id)
    }

    /// Returns the underlying i32 value.
    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for TmdbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<TmdbId> for i32 {
    fn from(id: TmdbId) -> Self {
        id.0
    }
}

impl From<i32> for TmdbId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl Serialize for TmdbId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for TmdbId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = i32::deserialize(deserializer)?;
        Ok(Self::new(id))
    }
}

/// Primary key of a title row in the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TitleId(i32);

impl TitleId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "TitleId should be non-negative");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<TitleId> for i32 {
    fn from(id: TitleId) -> Self {
        id.0
    }
}

impl From<i32> for TitleId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl Serialize for TitleId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for TitleId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = i32::deserialize(deserializer)?;
        Ok(Self::new(id))
    }
}

/// Identifier of a user, as issued by the external identity provider.
///
/// Opaque text; the store never generates these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Content kind of a title. Stored as `film`/`series` text in the database and
/// used to pick the catalog endpoint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleKind {
    Film,
    Series,
}

impl TitleKind {
    /// Stable string form, matching the stored column values.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Film => "film",
            Self::Series => "series",
        }
    }

    #[must_use]
    pub const fn is_film(&self) -> bool {
        matches!(self, Self::Film)
    }
}

impl fmt::Display for TitleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`TitleKind`] from text fails.
#[derive(Debug, Error)]
#[error("unknown title kind: {0} (expected 'film' or 'series')")]
pub struct ParseTitleKindError(String);

impl FromStr for TitleKind {
    type Err = ParseTitleKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "film" | "movie" => Ok(Self::Film),
            "series" | "tv" => Ok(Self::Series),
            other => Err(ParseTitleKindError(other.to_owned())),
        }
    }
}

/// A preferred genre derived from watch history, with its accumulated weight.
///
/// Weight is the sum of ratings of qualifying history entries carrying the
/// genre; not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenrePreference {
    pub genre_id: i32,
    pub weight: i32,
}
