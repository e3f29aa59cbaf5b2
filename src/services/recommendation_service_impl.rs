//! Pipeline implementation of the [`RecommendationService`] trait.
//!
//! Wires the stages together in order: preference estimation, candidate
//! aggregation, enrichment, the quality gate, heuristic scoring, and the
//! ranking model. Independent reads are parallelized.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Datelike;
use tracing::{info, warn};

use crate::clients::{CatalogClient, RankingClient, ReviewClient};
use crate::config::RecommendationsConfig;
use crate::db::Store;
use crate::domain::{TitleKind, UserId};
use crate::models::recommendation::Recommendation;
use crate::services::aggregator::CandidateAggregator;
use crate::services::enrichment::{EnrichmentStage, passes_quality_gate};
use crate::services::preferences::PreferenceEstimator;
use crate::services::ranking::{LlmRanker, build_prompt, merge_ranked};
use crate::services::recommendation_service::{RecommendationError, RecommendationService};
use crate::services::scoring::rank_candidates;

/// Stage-wired implementation of [`RecommendationService`].
pub struct DefaultRecommendationService {
    store: Store,
    catalog: Arc<dyn CatalogClient>,
    estimator: PreferenceEstimator,
    aggregator: CandidateAggregator,
    enrichment: EnrichmentStage,
    ranker: LlmRanker,
    config: RecommendationsConfig,
}

impl DefaultRecommendationService {
    #[must_use]
    pub fn new(
        store: Store,
        catalog: Arc<dyn CatalogClient>,
        reviews: Arc<dyn ReviewClient>,
        ranking: Arc<dyn RankingClient>,
        config: RecommendationsConfig,
    ) -> Self {
        Self {
            estimator: PreferenceEstimator::new(store.clone()),
            aggregator: CandidateAggregator::new(
                store.clone(),
                Arc::clone(&catalog),
                config.clone(),
            ),
            enrichment: EnrichmentStage::new(store.clone(), reviews, config.clone()),
            ranker: LlmRanker::new(ranking),
            store,
            catalog,
            config,
        }
    }

    /// Genre id to display name, for the prompt only. A failed lookup
    /// degrades to raw ids in the prompt text.
    async fn genre_names(&self, kind: TitleKind) -> HashMap<i32, String> {
        match self.catalog.genres(kind).await {
            Ok(genres) => genres.into_iter().map(|g| (g.id, g.name)).collect(),
            Err(err) => {
                warn!("Genre list fetch failed: {err:#}");
                HashMap::new()
            }
        }
    }
}

#[async_trait::async_trait]
impl RecommendationService for DefaultRecommendationService {
    async fn recommend(
        &self,
        user_id: &UserId,
        kind: TitleKind,
        limit: Option<usize>,
    ) -> Result<Vec<Recommendation>, RecommendationError> {
        let limit = limit.unwrap_or(self.config.default_limit);
        let user_id = user_id.as_str();

        let (preferences, excluded) = tokio::join!(
            self.estimator.genre_preferences(user_id, kind),
            self.estimator.excluded_ids(user_id, kind),
        );
        let preferences =
            preferences.map_err(|e| RecommendationError::Database(e.to_string()))?;
        let excluded = excluded.map_err(|e| RecommendationError::Database(e.to_string()))?;

        let pool = self
            .aggregator
            .gather(user_id, kind, &preferences, &excluded)
            .await
            .map_err(|e| RecommendationError::Database(e.to_string()))?;

        let enriched = self
            .enrichment
            .enrich(kind, pool)
            .await
            .map_err(|e| RecommendationError::Database(e.to_string()))?;

        let gated: Vec<_> = enriched
            .into_iter()
            .filter(|candidate| {
                passes_quality_gate(
                    candidate,
                    kind,
                    self.config.min_review_rating,
                    self.config.min_series_popularity,
                )
            })
            .collect();

        let scored = rank_candidates(
            gated,
            &preferences,
            chrono::Utc::now().year(),
            self.config.recency_window_years,
            self.config.max_ranked_candidates,
        );

        if scored.is_empty() {
            info!("No candidates survived the quality gate for user={user_id}");
            return Ok(Vec::new());
        }

        // The prompt context reads are independent; issue them together.
        let (history, watchlist, dismissed) = tokio::join!(
            self.store.get_history(
                user_id,
                Some(kind),
                Some(self.config.prompt_history_items as u64),
            ),
            self.store.get_watchlist(user_id, Some(kind)),
            self.store.get_dismissed(
                user_id,
                Some(kind),
                Some(self.config.prompt_dismissed_items as u64),
            ),
        );
        let history = history.map_err(|e| RecommendationError::Database(e.to_string()))?;
        let mut watchlist =
            watchlist.map_err(|e| RecommendationError::Database(e.to_string()))?;
        watchlist.truncate(self.config.prompt_watchlist_items);
        let dismissed = dismissed.map_err(|e| RecommendationError::Database(e.to_string()))?;

        let genre_names = self.genre_names(kind).await;

        let prompt = build_prompt(
            &history,
            &watchlist,
            &dismissed,
            &scored,
            &genre_names,
            limit,
        );
        let entries = self.ranker.rank(&prompt).await;

        let mut recommendations = merge_ranked(entries, scored, kind);
        recommendations.truncate(limit);

        info!(
            "Recommendation run for user={}: {} results",
            user_id,
            recommendations.len()
        );

        Ok(recommendations)
    }
}
