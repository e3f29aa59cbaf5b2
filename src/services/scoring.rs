//! Deterministic pre-ranking score for gate survivors.

use crate::domain::GenrePreference;
use crate::models::recommendation::{EnrichedCandidate, ScoredCandidate};

/// Sums four independent terms: catalog popularity, review rating, genre
/// overlap with the user's preferred genres, and release recency.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn heuristic_score(
    candidate: &EnrichedCandidate,
    preferences: &[GenrePreference],
    current_year: i32,
    recency_window_years: i32,
) -> f64 {
    let mut score = (candidate.title.vote_average / 10.0) * 20.0;

    if let Some(rating) = candidate.review_rating() {
        score += f64::from(rating) * 10.0;
    }

    let matched_genres = candidate
        .title
        .genre_ids
        .iter()
        .filter(|id| preferences.iter().any(|p| p.genre_id == **id))
        .count();
    score += matched_genres as f64 * 20.0;

    if let Some(release_year) = candidate.title.release_year() {
        let years_since = current_year - release_year;
        if (0..=recency_window_years).contains(&years_since) {
            score += f64::from((20 - years_since * 5).max(0));
        }
    }

    score
}

/// Scores every candidate, sorts descending, and keeps the top `cap` for the
/// ranking model. Ties keep their input order.
#[must_use]
pub fn rank_candidates(
    candidates: Vec<EnrichedCandidate>,
    preferences: &[GenrePreference],
    current_year: i32,
    recency_window_years: i32,
    cap: usize,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|candidate| {
            let score =
                heuristic_score(&candidate, preferences, current_year, recency_window_years);
            ScoredCandidate::new(candidate, score)
        })
        .collect();

    scored.sort_by(|a, b| b.heuristic_score.total_cmp(&a.heuristic_score));
    scored.truncate(cap);
    scored
}
