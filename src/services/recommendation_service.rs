//! Domain service for end-to-end recommendation runs.
//!
//! The trait abstracts the whole pipeline behind one call so front ends
//! depend on a seam rather than on the stage wiring.

use thiserror::Error;

use crate::domain::{TitleKind, UserId};
use crate::models::recommendation::Recommendation;

/// Domain errors for recommendation runs.
///
/// External fetch and ranking failures never surface here; each stage
/// degrades to an empty contribution. Only the datastore can hard-fail a run.
#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for RecommendationError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

/// Domain service trait for producing recommendations.
#[async_trait::async_trait]
pub trait RecommendationService: Send + Sync {
    /// Runs the full pipeline for one user and title kind: preference
    /// estimation, candidate aggregation, review enrichment, the quality
    /// gate, heuristic scoring, and model ranking.
    ///
    /// The result can legitimately be empty: a cold-start user with no
    /// qualifying candidates, or a ranking model that returned nothing
    /// usable.
    ///
    /// # Errors
    ///
    /// Returns [`RecommendationError::Database`] when a store read or write
    /// fails.
    async fn recommend(
        &self,
        user_id: &UserId,
        kind: TitleKind,
        limit: Option<usize>,
    ) -> Result<Vec<Recommendation>, RecommendationError>;
}
