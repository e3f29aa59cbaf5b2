//! Derives per-user genre weights and the excluded-title set from stored
//! watch activity.

use std::collections::{HashMap, HashSet};

use anyhow::Result;

use crate::db::Store;
use crate::domain::{GenrePreference, TitleKind};
use crate::models::watch::HistoryItem;

/// Ratings below this say nothing about taste and are ignored.
const MIN_PREFERENCE_RATING: i32 = 3;

/// Genres kept per user, strongest first.
const TOP_GENRES: usize = 3;

pub struct PreferenceEstimator {
    store: Store,
}

impl PreferenceEstimator {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Computes the user's strongest genres from rated history. An empty
    /// result is the cold-start state, not an error.
    pub async fn genre_preferences(
        &self,
        user_id: &str,
        kind: TitleKind,
    ) -> Result<Vec<GenrePreference>> {
        let history = self
            .store
            .history_rated_at_least(user_id, kind, MIN_PREFERENCE_RATING, None)
            .await?;

        Ok(accumulate_genre_weights(&history))
    }

    /// Catalog ids the user should never be recommended again: everything
    /// watchlisted, watched, or dismissed for this kind.
    pub async fn excluded_ids(&self, user_id: &str, kind: TitleKind) -> Result<HashSet<i32>> {
        let (watchlist, history, dismissed) = tokio::join!(
            self.store.watchlist_tmdb_ids(user_id, kind),
            self.store.history_tmdb_ids(user_id, kind),
            self.store.dismissed_tmdb_ids(user_id, kind),
        );

        let mut excluded = HashSet::new();
        excluded.extend(watchlist?);
        excluded.extend(history?);
        excluded.extend(dismissed?);
        Ok(excluded)
    }
}

/// Each qualifying history entry contributes its rating to every genre it
/// carries; the strongest [`TOP_GENRES`] survive, weight descending.
#[must_use]
pub fn accumulate_genre_weights(history: &[HistoryItem]) -> Vec<GenrePreference> {
    let mut weights: HashMap<i32, i32> = HashMap::new();

    for item in history {
        if item.rating < MIN_PREFERENCE_RATING {
            continue;
        }
        for genre_id in &item.genres {
            *weights.entry(*genre_id).or_insert(0) += item.rating;
        }
    }

    let mut preferences: Vec<GenrePreference> = weights
        .into_iter()
        .map(|(genre_id, weight)| GenrePreference { genre_id, weight })
        .collect();

    preferences.sort_by(|a, b| b.weight.cmp(&a.weight));
    preferences.truncate(TOP_GENRES);
    preferences
}
