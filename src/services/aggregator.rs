//! Builds the candidate pool: similar-to-highly-rated titles plus genre
//! discovery, deduplicated, exclusion-filtered, and quality-prefiltered.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::Datelike;
use tracing::{debug, warn};

use crate::clients::{CatalogClient, DiscoverParams};
use crate::config::RecommendationsConfig;
use crate::db::Store;
use crate::domain::{GenrePreference, TitleKind};
use crate::models::catalog::CatalogTitle;

/// Seeds are the user's recently watched titles rated at least this.
const MIN_SEED_RATING: i32 = 4;

pub struct CandidateAggregator {
    store: Store,
    catalog: Arc<dyn CatalogClient>,
    config: RecommendationsConfig,
}

impl CandidateAggregator {
    #[must_use]
    pub fn new(store: Store, catalog: Arc<dyn CatalogClient>, config: RecommendationsConfig) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    /// Gathers, merges, and prefilters the candidate pool for one user.
    /// Individual fetch failures are logged and skipped; an empty pool is a
    /// valid outcome.
    pub async fn gather(
        &self,
        user_id: &str,
        kind: TitleKind,
        preferences: &[GenrePreference],
        excluded: &HashSet<i32>,
    ) -> Result<Vec<CatalogTitle>> {
        let mut batches: Vec<Vec<CatalogTitle>> = Vec::new();

        let seeds = self
            .store
            .history_rated_at_least(
                user_id,
                kind,
                MIN_SEED_RATING,
                Some(self.config.seed_titles as u64),
            )
            .await?;

        let seed_fetches: Vec<_> = seeds
            .iter()
            .map(|seed| async move { (seed, self.catalog.similar(kind, seed.tmdb_id, 1).await) })
            .collect();

        for (seed, result) in futures::future::join_all(seed_fetches).await {
            match result {
                Ok(mut similar) => {
                    similar.truncate(self.config.similar_per_seed);
                    batches.push(similar);
                }
                Err(err) => {
                    warn!("Similar-title fetch failed for '{}': {err:#}", seed.title);
                }
            }
        }

        batches.extend(self.discover_batches(kind, preferences).await);

        let merged = merge_candidates(batches, excluded);
        let pool = apply_prefilter(
            merged,
            self.config.min_popularity,
            self.config.min_vote_count,
            self.config.max_enrichment_pool,
        );

        debug!(
            "Candidate pool for user={}: {} titles after prefilter",
            user_id,
            pool.len()
        );

        Ok(pool)
    }

    /// Discovery pages, fetched concurrently. With genre preferences the
    /// query is genre-filtered; without, it is a generic popularity listing
    /// over the same recency window.
    async fn discover_batches(
        &self,
        kind: TitleKind,
        preferences: &[GenrePreference],
    ) -> Vec<Vec<CatalogTitle>> {
        let from_year = chrono::Utc::now().year() - self.config.discovery_window_years;
        let genre_ids: Vec<i32> = preferences.iter().map(|p| p.genre_id).collect();

        let pages: Vec<_> = (1..=self.config.discover_pages)
            .map(|page| {
                let params = DiscoverParams {
                    genres: genre_ids.clone(),
                    min_vote_count: Some(self.config.min_vote_count),
                    min_vote_average: Some(self.config.min_popularity),
                    release_date_from: Some(format!("{from_year}-01-01")),
                    sort_by: Some("popularity.desc".to_string()),
                    page,
                };
                async move { self.catalog.discover(kind, &params).await }
            })
            .collect();

        let mut batches = Vec::new();
        for result in futures::future::join_all(pages).await {
            match result {
                Ok(batch) => batches.push(batch),
                Err(err) => warn!("Discovery page fetch failed: {err:#}"),
            }
        }
        batches
    }
}

/// Flattens batches in order, keeping the first occurrence of each catalog id
/// and dropping anything in the excluded set.
#[must_use]
pub fn merge_candidates(
    batches: Vec<Vec<CatalogTitle>>,
    excluded: &HashSet<i32>,
) -> Vec<CatalogTitle> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for title in batches.into_iter().flatten() {
        if excluded.contains(&title.id) {
            continue;
        }
        if seen.insert(title.id) {
            merged.push(title);
        }
    }

    merged
}

/// Drops candidates below the popularity or vote-count floor, then keeps the
/// top `cap` by popularity rating.
#[must_use]
pub fn apply_prefilter(
    mut candidates: Vec<CatalogTitle>,
    min_vote_average: f64,
    min_vote_count: u32,
    cap: usize,
) -> Vec<CatalogTitle> {
    candidates.retain(|t| t.vote_average >= min_vote_average && t.vote_count >= min_vote_count);
    candidates.sort_by(|a, b| b.vote_average.total_cmp(&a.vote_average));
    candidates.truncate(cap);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title(id: i32, vote_average: f64, vote_count: u32) -> CatalogTitle {
        CatalogTitle {
            id,
            title: format!("Title {id}"),
            release_date: Some("2023-06-01".to_string()),
            genre_ids: vec![18],
            overview: None,
            poster_path: None,
            vote_average,
            vote_count,
            media_type: None,
        }
    }

    #[test]
    fn merge_deduplicates_first_occurrence_wins() {
        let batches = vec![
            vec![title(1, 8.0, 100), title(2, 7.0, 100)],
            vec![title(2, 1.0, 1), title(3, 6.8, 100)],
        ];
        let merged = merge_candidates(batches, &HashSet::new());

        assert_eq!(merged.len(), 3);
        let second = merged.iter().find(|t| t.id == 2).unwrap();
        assert!((second.vote_average - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn merge_is_idempotent() {
        let batches = vec![vec![title(1, 8.0, 100), title(1, 8.0, 100)]];
        let merged = merge_candidates(batches, &HashSet::new());
        assert_eq!(merged.len(), 1);

        let remerged = merge_candidates(vec![merged], &HashSet::new());
        assert_eq!(remerged.len(), 1);
    }

    #[test]
    fn merge_drops_excluded_ids() {
        let excluded: HashSet<i32> = [2].into_iter().collect();
        let batches = vec![vec![title(1, 8.0, 100), title(2, 9.0, 500)]];
        let merged = merge_candidates(batches, &excluded);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, 1);
    }

    #[test]
    fn prefilter_enforces_both_floors() {
        let candidates = vec![
            title(1, 6.5, 50),
            title(2, 6.4, 500),
            title(3, 9.0, 49),
            title(4, 7.2, 300),
        ];
        let kept = apply_prefilter(candidates, 6.5, 50, 100);

        let ids: Vec<i32> = kept.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![4, 1]);
    }

    #[test]
    fn prefilter_caps_at_top_by_popularity() {
        let candidates = vec![
            title(1, 7.0, 100),
            title(2, 8.5, 100),
            title(3, 8.0, 100),
        ];
        let kept = apply_prefilter(candidates, 6.5, 50, 2);

        let ids: Vec<i32> = kept.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
