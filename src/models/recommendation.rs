use serde::{Deserialize, Serialize};

use crate::domain::TitleKind;
use crate::models::catalog::CatalogTitle;
use crate::models::review::ReviewMatch;

/// A candidate after the enrichment stage: catalog metadata plus whatever
/// review was found (always `None` on the series path).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedCandidate {
    pub title: CatalogTitle,
    pub review: Option<ReviewMatch>,
}

impl EnrichedCandidate {
    #[must_use]
    pub fn review_rating(&self) -> Option<i32> {
        self.review.as_ref().and_then(|r| r.rating)
    }
}

/// An enriched candidate with its deterministic pre-ranking score attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub title: CatalogTitle,
    pub review: Option<ReviewMatch>,
    pub heuristic_score: f64,
}

impl ScoredCandidate {
    #[must_use]
    pub fn new(candidate: EnrichedCandidate, heuristic_score: f64) -> Self {
        Self {
            title: candidate.title,
            review: candidate.review,
            heuristic_score,
        }
    }

    #[must_use]
    pub fn review_rating(&self) -> Option<i32> {
        self.review.as_ref().and_then(|r| r.rating)
    }
}

/// A final recommendation: the candidate's metadata joined with the ranking
/// model's score and justification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub tmdb_id: i32,
    pub title: String,
    pub kind: TitleKind,
    pub release_year: Option<i32>,
    pub genre_ids: Vec<i32>,
    pub poster_url: Option<String>,
    pub overview: Option<String>,
    pub vote_average: f64,
    pub review_rating: Option<i32>,
    pub review_url: Option<String>,
    pub score: f64,
    pub reasoning: String,
}
