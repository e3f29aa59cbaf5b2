//! Domain service for watch activity: history, watchlist, dismissals, and
//! title search.
//!
//! These are the user-driven collaborators around the recommendation
//! pipeline. Unlike pipeline fetches, catalog failures here surface as
//! errors, since each call is a direct user action.

use thiserror::Error;

use crate::domain::{TitleKind, TmdbId, UserId};
use crate::models::catalog::CatalogTitle;
use crate::models::watch::{DismissedItem, HistoryItem, WatchlistItem};

/// Domain errors for watch activity operations.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Title not found: {0}")]
    NotFound(TmdbId),

    #[error("Already in watchlist: {0}")]
    AlreadyInWatchlist(TmdbId),

    #[error("Already dismissed: {0}")]
    AlreadyDismissed(TmdbId),

    #[error("Invalid rating: {0} (must be 1-5)")]
    InvalidRating(i32),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl From<sea_orm::DbErr> for WatchError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

/// Domain service trait for watch activity.
#[async_trait::async_trait]
pub trait WatchService: Send + Sync {
    /// Records a title as watched with a rating: upserts the title from
    /// catalog metadata, writes the history row (overwriting rating and
    /// notes on a re-watch), and drops any matching watchlist entry.
    ///
    /// # Errors
    ///
    /// - Returns [`WatchError::InvalidRating`] if `rating` is outside 1-5
    /// - Returns [`WatchError::NotFound`] if the catalog has no such title
    /// - Returns [`WatchError::Catalog`] if the catalog lookup fails
    /// - Returns [`WatchError::Database`] on store failures
    async fn mark_watched(
        &self,
        user_id: &UserId,
        tmdb_id: TmdbId,
        kind: TitleKind,
        rating: i32,
        notes: Option<String>,
    ) -> Result<HistoryItem, WatchError>;

    /// Updates rating and notes of an existing history entry.
    ///
    /// # Errors
    ///
    /// - Returns [`WatchError::InvalidRating`] if `rating` is outside 1-5
    /// - Returns [`WatchError::NotFound`] if no history entry exists
    /// - Returns [`WatchError::Database`] on store failures
    async fn update_watched(
        &self,
        user_id: &UserId,
        tmdb_id: TmdbId,
        rating: i32,
        notes: Option<String>,
    ) -> Result<(), WatchError>;

    /// Removes a history entry.
    ///
    /// # Errors
    ///
    /// - Returns [`WatchError::NotFound`] if no history entry exists
    /// - Returns [`WatchError::Database`] on store failures
    async fn remove_watched(&self, user_id: &UserId, tmdb_id: TmdbId) -> Result<(), WatchError>;

    /// Lists watch history, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Database`] on store failures.
    async fn history(
        &self,
        user_id: &UserId,
        kind: Option<TitleKind>,
        limit: Option<u64>,
    ) -> Result<Vec<HistoryItem>, WatchError>;

    /// Lists 4-5 star history entries, most recent first. These are the
    /// titles the pipeline uses as similarity seeds.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Database`] on store failures.
    async fn highly_rated(
        &self,
        user_id: &UserId,
        kind: TitleKind,
        limit: Option<u64>,
    ) -> Result<Vec<HistoryItem>, WatchError>;

    /// Adds a title to the watchlist, upserting it from catalog metadata
    /// first. For films without stored review data this may spawn a
    /// detached review lookup.
    ///
    /// # Errors
    ///
    /// - Returns [`WatchError::AlreadyInWatchlist`] on a duplicate add
    /// - Returns [`WatchError::NotFound`] if the catalog has no such title
    /// - Returns [`WatchError::Catalog`] if the catalog lookup fails
    /// - Returns [`WatchError::Database`] on store failures
    async fn add_to_watchlist(
        &self,
        user_id: &UserId,
        tmdb_id: TmdbId,
        kind: TitleKind,
    ) -> Result<WatchlistItem, WatchError>;

    /// Removes a watchlist entry.
    ///
    /// # Errors
    ///
    /// - Returns [`WatchError::NotFound`] if no watchlist entry exists
    /// - Returns [`WatchError::Database`] on store failures
    async fn remove_from_watchlist(
        &self,
        user_id: &UserId,
        tmdb_id: TmdbId,
    ) -> Result<(), WatchError>;

    /// Lists the watchlist, newest first, with watched titles filtered out.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Database`] on store failures.
    async fn watchlist(
        &self,
        user_id: &UserId,
        kind: Option<TitleKind>,
    ) -> Result<Vec<WatchlistItem>, WatchError>;

    /// Whether the title is currently on the user's watchlist.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Database`] on store failures.
    async fn watchlist_contains(
        &self,
        user_id: &UserId,
        tmdb_id: TmdbId,
    ) -> Result<bool, WatchError>;

    /// Dismisses a recommendation so it never resurfaces. The title row is
    /// upserted first so the dismissal survives catalog churn.
    ///
    /// # Errors
    ///
    /// - Returns [`WatchError::AlreadyDismissed`] on a duplicate dismissal
    /// - Returns [`WatchError::NotFound`] if the catalog has no such title
    /// - Returns [`WatchError::Catalog`] if the catalog lookup fails
    /// - Returns [`WatchError::Database`] on store failures
    async fn dismiss(
        &self,
        user_id: &UserId,
        tmdb_id: TmdbId,
        kind: TitleKind,
    ) -> Result<(), WatchError>;

    /// Clears a dismissal, letting the title be recommended again.
    ///
    /// # Errors
    ///
    /// - Returns [`WatchError::NotFound`] if no dismissal exists
    /// - Returns [`WatchError::Database`] on store failures
    async fn undismiss(&self, user_id: &UserId, tmdb_id: TmdbId) -> Result<(), WatchError>;

    /// Lists dismissed recommendations, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Database`] on store failures.
    async fn dismissed(&self, user_id: &UserId) -> Result<Vec<DismissedItem>, WatchError>;

    /// Searches the catalog by text, optionally scoped to one kind.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Catalog`] if the catalog call fails.
    async fn search(
        &self,
        query: &str,
        kind: Option<TitleKind>,
    ) -> Result<Vec<CatalogTitle>, WatchError>;
}
