//! `SeaORM` implementation of the [`WatchService`] trait.
//!
//! Every mutation upserts the user row first so foreign keys resolve, and
//! upserts the title row from catalog metadata so activity survives catalog
//! churn. Watchlisted films without review data get an opportunistic,
//! detached review lookup.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::clients::{CatalogClient, ReviewClient};
use crate::config::RecommendationsConfig;
use crate::db::{Store, StoreError};
use crate::domain::{TitleKind, TmdbId, UserId};
use crate::entities::titles;
use crate::models::catalog::CatalogTitle;
use crate::models::title::TitleUpsert;
use crate::models::watch::{DismissedItem, HistoryItem, WatchlistItem};
use crate::services::watch_service::{WatchError, WatchService};

/// History entries at or above this rating count as highly rated.
const HIGHLY_RATED_MIN_RATING: i32 = 4;

/// A "no rating found" review check older than this is stale and may be
/// retried. A stored rating is never re-fetched.
const REVIEW_RECHECK_DAYS: i64 = 30;

/// SeaORM-backed implementation of [`WatchService`].
pub struct SeaOrmWatchService {
    store: Store,
    catalog: Arc<dyn CatalogClient>,
    reviews: Arc<dyn ReviewClient>,
    config: RecommendationsConfig,
}

impl SeaOrmWatchService {
    #[must_use]
    pub fn new(
        store: Store,
        catalog: Arc<dyn CatalogClient>,
        reviews: Arc<dyn ReviewClient>,
        config: RecommendationsConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            reviews,
            config,
        }
    }

    /// Fetches catalog details and upserts both the user and the title row.
    /// Review columns are never touched by the metadata upsert.
    async fn resolve_title(
        &self,
        user_id: &UserId,
        tmdb_id: TmdbId,
        kind: TitleKind,
    ) -> Result<titles::Model, WatchError> {
        let details = self
            .catalog
            .details(kind, tmdb_id.value())
            .await
            .map_err(|e| WatchError::Catalog(e.to_string()))?
            .ok_or(WatchError::NotFound(tmdb_id))?;

        self.store
            .upsert_user(user_id.as_str(), None, None)
            .await
            .map_err(|e| WatchError::Database(e.to_string()))?;

        self.store
            .upsert_title(&TitleUpsert::from_catalog(&details, kind))
            .await
            .map_err(|e| WatchError::Database(e.to_string()))
    }

    /// Looks up the stored title row, failing with `NotFound` when the id
    /// has never been seen.
    async fn stored_title(&self, tmdb_id: TmdbId) -> Result<titles::Model, WatchError> {
        self.store
            .get_title_by_tmdb_id(tmdb_id.value())
            .await
            .map_err(|e| WatchError::Database(e.to_string()))?
            .ok_or(WatchError::NotFound(tmdb_id))
    }

    /// Spawns a detached review lookup for a film. A 4-5 star match is
    /// stored; anything else just stamps the check time so the next retry
    /// waits out the staleness window. Failures are logged, never surfaced.
    fn spawn_review_refresh(&self, title: titles::Model) {
        let store = self.store.clone();
        let reviews = Arc::clone(&self.reviews);
        let min_rating = self.config.min_review_rating;

        tokio::spawn(async move {
            debug!("Checking for a review of '{}'", title.title);

            match reviews
                .best_review(&title.title, title.release_year, Some(TitleKind::Film))
                .await
            {
                Ok(Some(found)) if found.rating.is_some_and(|r| r >= min_rating) => {
                    if let Err(err) = store
                        .set_title_review(
                            title.tmdb_id,
                            found.rating,
                            found.url.as_deref(),
                            found.excerpt.as_deref(),
                        )
                        .await
                    {
                        warn!("Failed to store review for '{}': {err:#}", title.title);
                    }
                }
                Ok(_) => {
                    if let Err(err) = store.mark_title_review_checked(title.tmdb_id).await {
                        warn!(
                            "Failed to record review check for '{}': {err:#}",
                            title.title
                        );
                    }
                }
                Err(err) => warn!("Review lookup failed for '{}': {err:#}", title.title),
            }
        });
    }
}

#[async_trait::async_trait]
impl WatchService for SeaOrmWatchService {
    async fn mark_watched(
        &self,
        user_id: &UserId,
        tmdb_id: TmdbId,
        kind: TitleKind,
        rating: i32,
        notes: Option<String>,
    ) -> Result<HistoryItem, WatchError> {
        if !(1..=5).contains(&rating) {
            return Err(WatchError::InvalidRating(rating));
        }

        let title = self.resolve_title(user_id, tmdb_id, kind).await?;

        self.store
            .record_watch(user_id.as_str(), title.id, kind, rating, notes.as_deref())
            .await
            .map_err(|e| WatchError::Database(e.to_string()))?;

        Ok(HistoryItem {
            tmdb_id: title.tmdb_id,
            title: title.title,
            kind,
            release_year: title.release_year,
            genres: title
                .genres
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            poster_url: title.poster_url,
            rating,
            notes,
            watched_at: Utc::now().to_rfc3339(),
        })
    }

    async fn update_watched(
        &self,
        user_id: &UserId,
        tmdb_id: TmdbId,
        rating: i32,
        notes: Option<String>,
    ) -> Result<(), WatchError> {
        if !(1..=5).contains(&rating) {
            return Err(WatchError::InvalidRating(rating));
        }

        let title = self.stored_title(tmdb_id).await?;

        let updated = self
            .store
            .update_watch(user_id.as_str(), title.id, rating, notes.as_deref())
            .await
            .map_err(|e| WatchError::Database(e.to_string()))?;

        if updated {
            Ok(())
        } else {
            Err(WatchError::NotFound(tmdb_id))
        }
    }

    async fn remove_watched(&self, user_id: &UserId, tmdb_id: TmdbId) -> Result<(), WatchError> {
        let title = self.stored_title(tmdb_id).await?;

        let removed = self
            .store
            .remove_watch(user_id.as_str(), title.id)
            .await
            .map_err(|e| WatchError::Database(e.to_string()))?;

        if removed {
            Ok(())
        } else {
            Err(WatchError::NotFound(tmdb_id))
        }
    }

    async fn history(
        &self,
        user_id: &UserId,
        kind: Option<TitleKind>,
        limit: Option<u64>,
    ) -> Result<Vec<HistoryItem>, WatchError> {
        self.store
            .get_history(user_id.as_str(), kind, limit)
            .await
            .map_err(|e| WatchError::Database(e.to_string()))
    }

    async fn highly_rated(
        &self,
        user_id: &UserId,
        kind: TitleKind,
        limit: Option<u64>,
    ) -> Result<Vec<HistoryItem>, WatchError> {
        self.store
            .history_rated_at_least(user_id.as_str(), kind, HIGHLY_RATED_MIN_RATING, limit)
            .await
            .map_err(|e| WatchError::Database(e.to_string()))
    }

    async fn add_to_watchlist(
        &self,
        user_id: &UserId,
        tmdb_id: TmdbId,
        kind: TitleKind,
    ) -> Result<WatchlistItem, WatchError> {
        let title = self.resolve_title(user_id, tmdb_id, kind).await?;

        let entry = match self
            .store
            .add_to_watchlist(user_id.as_str(), title.id, kind)
            .await
        {
            Ok(entry) => entry,
            Err(StoreError::Duplicate) => return Err(WatchError::AlreadyInWatchlist(tmdb_id)),
            Err(StoreError::Database(e)) => return Err(WatchError::Database(e)),
        };

        if kind.is_film()
            && title.review_rating.is_none()
            && !review_check_is_fresh(title.review_checked_at.as_deref(), Utc::now())
        {
            self.spawn_review_refresh(title.clone());
        }

        Ok(WatchlistItem {
            tmdb_id: title.tmdb_id,
            title: title.title,
            kind,
            release_year: title.release_year,
            poster_url: title.poster_url,
            added_at: entry.added_at,
        })
    }

    async fn remove_from_watchlist(
        &self,
        user_id: &UserId,
        tmdb_id: TmdbId,
    ) -> Result<(), WatchError> {
        let title = self.stored_title(tmdb_id).await?;

        let removed = self
            .store
            .remove_from_watchlist(user_id.as_str(), title.id)
            .await
            .map_err(|e| WatchError::Database(e.to_string()))?;

        if removed {
            Ok(())
        } else {
            Err(WatchError::NotFound(tmdb_id))
        }
    }

    async fn watchlist(
        &self,
        user_id: &UserId,
        kind: Option<TitleKind>,
    ) -> Result<Vec<WatchlistItem>, WatchError> {
        self.store
            .get_watchlist(user_id.as_str(), kind)
            .await
            .map_err(|e| WatchError::Database(e.to_string()))
    }

    async fn watchlist_contains(
        &self,
        user_id: &UserId,
        tmdb_id: TmdbId,
    ) -> Result<bool, WatchError> {
        let Some(title) = self
            .store
            .get_title_by_tmdb_id(tmdb_id.value())
            .await
            .map_err(|e| WatchError::Database(e.to_string()))?
        else {
            return Ok(false);
        };

        self.store
            .watchlist_contains(user_id.as_str(), title.id)
            .await
            .map_err(|e| WatchError::Database(e.to_string()))
    }

    async fn dismiss(
        &self,
        user_id: &UserId,
        tmdb_id: TmdbId,
        kind: TitleKind,
    ) -> Result<(), WatchError> {
        let title = self.resolve_title(user_id, tmdb_id, kind).await?;

        match self
            .store
            .dismiss(user_id.as_str(), title.id, title.tmdb_id, kind)
            .await
        {
            Ok(_) => Ok(()),
            Err(StoreError::Duplicate) => Err(WatchError::AlreadyDismissed(tmdb_id)),
            Err(StoreError::Database(e)) => Err(WatchError::Database(e)),
        }
    }

    async fn undismiss(&self, user_id: &UserId, tmdb_id: TmdbId) -> Result<(), WatchError> {
        let removed = self
            .store
            .undismiss(user_id.as_str(), tmdb_id.value())
            .await
            .map_err(|e| WatchError::Database(e.to_string()))?;

        if removed {
            Ok(())
        } else {
            Err(WatchError::NotFound(tmdb_id))
        }
    }

    async fn dismissed(&self, user_id: &UserId) -> Result<Vec<DismissedItem>, WatchError> {
        self.store
            .get_dismissed(user_id.as_str(), None, None)
            .await
            .map_err(|e| WatchError::Database(e.to_string()))
    }

    async fn search(
        &self,
        query: &str,
        kind: Option<TitleKind>,
    ) -> Result<Vec<CatalogTitle>, WatchError> {
        let results = match kind {
            Some(TitleKind::Film) => self.catalog.search_films(query, 1).await,
            Some(TitleKind::Series) => self.catalog.search_series(query, 1).await,
            None => self.catalog.search_multi(query, 1).await,
        };

        results.map_err(|e| WatchError::Catalog(e.to_string()))
    }
}

/// Whether a stored review check is recent enough to skip another lookup.
/// Unreadable timestamps count as stale.
#[must_use]
pub fn review_check_is_fresh(checked_at: Option<&str>, now: DateTime<Utc>) -> bool {
    checked_at
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .is_some_and(|t| {
            now.signed_duration_since(t.with_timezone(&Utc))
                < chrono::Duration::days(REVIEW_RECHECK_DAYS)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn never_checked_is_stale() {
        assert!(!review_check_is_fresh(None, now()));
    }

    #[test]
    fn recent_check_is_fresh() {
        assert!(review_check_is_fresh(
            Some("2025-06-01T00:00:00Z"),
            now()
        ));
    }

    #[test]
    fn old_check_is_stale() {
        assert!(!review_check_is_fresh(
            Some("2025-05-01T00:00:00Z"),
            now()
        ));
    }

    #[test]
    fn garbage_timestamp_is_stale() {
        assert!(!review_check_is_fresh(Some("last tuesday"), now()));
    }
}
