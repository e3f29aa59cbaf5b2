//! Attaches editorial review data to film candidates and applies the strict
//! quality gate.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::clients::ReviewClient;
use crate::config::RecommendationsConfig;
use crate::constants::enrichment;
use crate::db::Store;
use crate::domain::TitleKind;
use crate::models::catalog::CatalogTitle;
use crate::models::recommendation::EnrichedCandidate;
use crate::models::review::ReviewMatch;
use crate::models::title::TitleUpsert;

pub struct EnrichmentStage {
    store: Store,
    reviews: Arc<dyn ReviewClient>,
    config: RecommendationsConfig,
}

impl EnrichmentStage {
    #[must_use]
    pub fn new(store: Store, reviews: Arc<dyn ReviewClient>, config: RecommendationsConfig) -> Self {
        Self {
            store,
            reviews,
            config,
        }
    }

    /// Decorates candidates with review data. Films reuse stored ratings
    /// where available and look the rest up live with bounded concurrency;
    /// series are passed through with no review fields. Individual lookup
    /// failures downgrade to "no rating found".
    pub async fn enrich(
        &self,
        kind: TitleKind,
        candidates: Vec<CatalogTitle>,
    ) -> Result<Vec<EnrichedCandidate>> {
        if kind == TitleKind::Series {
            return Ok(candidates
                .into_iter()
                .map(|title| EnrichedCandidate {
                    title,
                    review: None,
                })
                .collect());
        }

        let ids: Vec<i32> = candidates.iter().map(|t| t.id).collect();
        let stored: HashMap<i32, ReviewMatch> = self
            .store
            .reviewed_titles(&ids)
            .await?
            .into_iter()
            .map(|row| {
                (
                    row.tmdb_id,
                    ReviewMatch {
                        url: row.review_url,
                        rating: row.review_rating,
                        excerpt: row.review_excerpt,
                    },
                )
            })
            .collect();

        let (known, pending): (Vec<CatalogTitle>, Vec<CatalogTitle>) = candidates
            .into_iter()
            .partition(|t| stored.contains_key(&t.id));

        let mut enriched: Vec<EnrichedCandidate> = known
            .into_iter()
            .map(|title| {
                let review = stored.get(&title.id).cloned();
                EnrichedCandidate { title, review }
            })
            .collect();

        debug!(
            "Review enrichment: {} stored, {} live lookups",
            enriched.len(),
            pending.len()
        );

        let looked_up: Vec<EnrichedCandidate> = futures::stream::iter(pending)
            .map(|title| async move { self.lookup_and_persist(title).await })
            .buffer_unordered(enrichment::CONCURRENT_LOOKUPS)
            .collect()
            .await;

        enriched.extend(looked_up);
        Ok(enriched)
    }

    async fn lookup_and_persist(&self, title: CatalogTitle) -> EnrichedCandidate {
        let review = match self
            .reviews
            .best_review(&title.title, title.release_year(), Some(TitleKind::Film))
            .await
        {
            Ok(review) => review,
            Err(err) => {
                warn!("Review lookup failed for '{}': {err:#}", title.title);
                None
            }
        };

        if let Some(found) = &review
            && found
                .rating
                .is_some_and(|r| r >= self.config.min_review_rating)
        {
            if let Err(err) = self.persist_review(&title, found).await {
                warn!("Failed to persist review for '{}': {err:#}", title.title);
            }
        }

        EnrichedCandidate { title, review }
    }

    async fn persist_review(&self, title: &CatalogTitle, review: &ReviewMatch) -> Result<()> {
        self.store
            .upsert_title(&TitleUpsert::from_catalog(title, TitleKind::Film))
            .await?;
        self.store
            .set_title_review(
                title.id,
                review.rating,
                review.url.as_deref(),
                review.excerpt.as_deref(),
            )
            .await?;
        Ok(())
    }
}

/// The strict quality gate: films need a review rating at or above the film
/// floor; series need a popularity rating at or above the series floor.
#[must_use]
pub fn passes_quality_gate(
    candidate: &EnrichedCandidate,
    kind: TitleKind,
    min_review_rating: i32,
    min_series_popularity: f64,
) -> bool {
    match kind {
        TitleKind::Film => candidate
            .review_rating()
            .is_some_and(|r| r >= min_review_rating),
        TitleKind::Series => candidate.title.vote_average >= min_series_popularity,
    }
}
