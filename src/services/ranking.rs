//! Packages a bounded context into a ranking prompt, and parses the model's
//! JSON reply with one bounded repair pass.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::clients::RankingClient;
use crate::domain::TitleKind;
use crate::models::recommendation::{Recommendation, ScoredCandidate};
use crate::models::watch::{DismissedItem, HistoryItem, WatchlistItem};

/// One entry of the model's ranked output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub title_id: i32,
    pub score: f64,
    pub reasoning: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RankingError {
    #[error("response contains no JSON array")]
    NoJsonArray,
    #[error("response JSON could not be parsed after repair")]
    Unparseable,
}

pub struct LlmRanker {
    client: Arc<dyn RankingClient>,
}

impl LlmRanker {
    #[must_use]
    pub fn new(client: Arc<dyn RankingClient>) -> Self {
        Self { client }
    }

    /// Sends the prompt and parses the reply. Transport and parse failures
    /// both degrade to an empty ranked set; the caller treats that as
    /// "ranking unavailable".
    pub async fn rank(&self, prompt: &str) -> Vec<RankedEntry> {
        let raw = match self.client.complete(prompt).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!("Ranking model call failed: {err:#}");
                return Vec::new();
            }
        };

        match parse_ranking(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Ranking output rejected: {err}");
                Vec::new()
            }
        }
    }
}

/// Builds the single-turn ranking prompt from the bounded context. Callers
/// are responsible for truncating each slice to its prompt budget.
#[must_use]
pub fn build_prompt(
    history: &[HistoryItem],
    watchlist: &[WatchlistItem],
    dismissed: &[DismissedItem],
    candidates: &[ScoredCandidate],
    genre_names: &HashMap<i32, String>,
    limit: usize,
) -> String {
    let highly_rated = join_lines(
        history
            .iter()
            .filter(|item| item.rating >= 4)
            .map(|item| history_line(item, genre_names)),
    );

    let low_rated = join_lines(
        history
            .iter()
            .filter(|item| item.rating <= 2)
            .map(|item| history_line(item, genre_names)),
    );

    let watchlist_text = watchlist
        .iter()
        .map(|item| item.title.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let dismissed_text = dismissed
        .iter()
        .map(|item| item.title.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let candidates_text = join_lines(
        candidates
            .iter()
            .enumerate()
            .map(|(idx, candidate)| candidate_line(idx, candidate, genre_names)),
    );

    format!(
        r#"You are an expert film and TV recommendation system. Analyze the user's viewing history and recommend titles from the candidate list.

## User's Highly Rated Content (4-5 stars):
{}

## User's Low Rated Content (1-2 stars):
{}

## User's Watchlist:
{}

## Recently Dismissed Recommendations (the user waved these away; avoid near-identical picks):
{}

## Candidate Titles to Evaluate:
{}

TASK: Recommend the top {limit} titles from the candidate list that best match this user's taste. Consider:
1. What patterns do you see in their highly-rated content? (themes, genres, tone, era)
2. What did they dislike? (avoid similar titles)
3. Guardian ratings (high Guardian scores often indicate quality)
4. Diversity (don't just recommend one type)

Return ONLY a valid JSON array. No markdown, no explanations, just the JSON array.

Format each object exactly like this:
{{"titleId": 123, "score": 85, "reasoning": "Simple explanation without any quotes or special characters"}}

CRITICAL RULES:
1. Use double quotes for all JSON keys and string values
2. In reasoning text: NO quotes, NO apostrophes, NO special characters
3. Write it is instead of it's, write Breaking Bad without quotes
4. Separate objects with commas
5. The entire response must be valid JSON

Return exactly {limit} recommendations ordered by score (highest first)."#,
        fallback(&highly_rated, "None yet"),
        fallback(&low_rated, "None yet"),
        fallback(&watchlist_text, "Empty"),
        fallback(&dismissed_text, "None"),
        fallback(&candidates_text, "None"),
    )
}

fn fallback<'a>(text: &'a str, default: &'a str) -> &'a str {
    if text.is_empty() { default } else { text }
}

fn join_lines(lines: impl Iterator<Item = String>) -> String {
    lines.collect::<Vec<_>>().join("\n")
}

fn history_line(item: &HistoryItem, genre_names: &HashMap<i32, String>) -> String {
    let mut line = format!("\"{}\"", item.title);
    if let Some(year) = item.release_year {
        line.push_str(&format!(" ({year})"));
    }
    let genres = render_genres(&item.genres, genre_names);
    if !genres.is_empty() {
        line.push_str(&format!(" [{genres}]"));
    }
    line.push_str(&format!(" - {}/5 stars", item.rating));
    if let Some(notes) = &item.notes {
        line.push_str(&format!(" - Notes: {notes}"));
    }
    line
}

fn candidate_line(
    index: usize,
    candidate: &ScoredCandidate,
    genre_names: &HashMap<i32, String>,
) -> String {
    let title = &candidate.title;
    let mut line = format!("{}. [ID:{}] \"{}\"", index + 1, title.id, title.title);

    if let Some(year) = title.release_year() {
        line.push_str(&format!(" ({year})"));
    }
    let genres = render_genres(&title.genre_ids, genre_names);
    if !genres.is_empty() {
        line.push_str(&format!(" [{genres}]"));
    }

    let overview: String = title
        .overview
        .as_deref()
        .unwrap_or("")
        .chars()
        .take(150)
        .collect();
    line.push_str(&format!(" - {overview}..."));

    if let Some(rating) = candidate.review_rating() {
        line.push_str(&format!(" | Guardian: {rating}/5 stars"));
    }
    line.push_str(&format!(" | TMDB: {:.1}/10", title.vote_average));
    line
}

/// Ids the catalog knows nothing about render as the bare number.
fn render_genres(ids: &[i32], names: &HashMap<i32, String>) -> String {
    ids.iter()
        .map(|id| names.get(id).cloned().unwrap_or_else(|| id.to_string()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Extracts and parses the model's ranked array: strict parse first, one
/// sanitize-and-repair retry on failure, then per-entry validation with
/// invalid entries dropped.
pub fn parse_ranking(raw: &str) -> Result<Vec<RankedEntry>, RankingError> {
    let start = raw.find('[').ok_or(RankingError::NoJsonArray)?;
    let end = raw.rfind(']').ok_or(RankingError::NoJsonArray)?;
    if end < start {
        return Err(RankingError::NoJsonArray);
    }
    let slice = &raw[start..=end];

    if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(slice) {
        return Ok(validate_entries(values));
    }

    let repaired = repair_json(slice);
    let values = serde_json::from_str::<Vec<serde_json::Value>>(&repaired)
        .map_err(|_| RankingError::Unparseable)?;
    Ok(validate_entries(values))
}

/// Keeps entries with a numeric `titleId`, numeric `score`, and string
/// `reasoning`; anything else is dropped.
fn validate_entries(values: Vec<serde_json::Value>) -> Vec<RankedEntry> {
    values
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect()
}

/// The bounded repair pass: normalize typographic characters the model
/// sneaks into "strict JSON", collapse whitespace, then reconstruct
/// near-miss objects (stray or missing quotes around the reasoning text).
fn repair_json(raw: &str) -> String {
    static COMPLETE_OBJECT: OnceLock<Regex> = OnceLock::new();
    static MISSING_QUOTE: OnceLock<Regex> = OnceLock::new();

    let normalized: String = raw
        .chars()
        .filter_map(|c| match c {
            '\u{201C}' | '\u{201D}' => Some('"'),
            '\u{2013}' | '\u{2014}' => Some('-'),
            '\u{2018}' | '\u{2019}' => None,
            '\n' | '\r' | '\t' => Some(' '),
            c => Some(c),
        })
        .collect();
    let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

    let complete = COMPLETE_OBJECT.get_or_init(|| {
        Regex::new(
            r#"\{\s*"titleId":\s*(\d+),\s*"score":\s*(\d+(?:\.\d+)?),\s*"reasoning":\s*"([^"}]*?)"\s*\}"#,
        )
        .expect("Invalid ranking repair regex")
    });
    let repaired = complete.replace_all(&collapsed, |caps: &regex::Captures<'_>| {
        let reasoning = caps[3].replace(['"', '\''], "");
        format!(
            "{{\"titleId\":{},\"score\":{},\"reasoning\":\"{}\"}}",
            &caps[1], &caps[2], reasoning
        )
    });

    let missing = MISSING_QUOTE.get_or_init(|| {
        Regex::new(
            r#"\{\s*"titleId":\s*(\d+),\s*"score":\s*(\d+(?:\.\d+)?),\s*"reasoning":\s*"([^"}]*?)\}"#,
        )
        .expect("Invalid ranking repair regex")
    });
    missing
        .replace_all(&repaired, "{\"titleId\":$1,\"score\":$2,\"reasoning\":\"$3\"}")
        .into_owned()
}

/// Maps ranked entries back to their enriched candidates by id. Unknown ids
/// are dropped, repeated ids keep their first occurrence, and the result is
/// sorted by the model's score, highest first.
#[must_use]
pub fn merge_ranked(
    entries: Vec<RankedEntry>,
    candidates: Vec<ScoredCandidate>,
    kind: TitleKind,
) -> Vec<Recommendation> {
    let mut by_id: HashMap<i32, ScoredCandidate> =
        candidates.into_iter().map(|c| (c.title.id, c)).collect();

    let mut recommendations: Vec<Recommendation> = entries
        .into_iter()
        .filter_map(|entry| {
            by_id.remove(&entry.title_id).map(|candidate| {
                let review_rating = candidate.review_rating();
                let review_url = candidate.review.as_ref().and_then(|r| r.url.clone());
                let title = candidate.title;
                let release_year = title.release_year();
                let poster_url = crate::clients::tmdb::poster_url(title.poster_path.as_deref());
                Recommendation {
                    tmdb_id: title.id,
                    title: title.title,
                    kind,
                    release_year,
                    genre_ids: title.genre_ids,
                    poster_url,
                    overview: title.overview,
                    vote_average: title.vote_average,
                    review_rating,
                    review_url,
                    score: entry.score,
                    reasoning: entry.reasoning,
                }
            })
        })
        .collect();

    recommendations.sort_by(|a, b| b.score.total_cmp(&a.score));
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::CatalogTitle;
    use crate::models::review::ReviewMatch;

    #[test]
    fn strict_json_parses_directly() {
        let raw = r#"[{"titleId": 157336, "score": 95, "reasoning": "Matches the cerebral sci-fi pattern"}]"#;
        let entries = parse_ranking(raw).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title_id, 157336);
        assert!((entries[0].score - 95.0).abs() < f64::EPSILON);
    }

    #[test]
    fn markdown_wrapped_array_is_extracted() {
        let raw = "Here are my picks:\n```json\n[{\"titleId\": 1, \"score\": 80, \"reasoning\": \"ok\"}]\n```";
        let entries = parse_ranking(raw).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn smart_quotes_are_repaired() {
        let raw = "[{\u{201C}titleId\u{201D}: 1, \u{201C}score\u{201D}: 80, \u{201C}reasoning\u{201D}: \u{201C}Great pick\u{201D}}]";
        let entries = parse_ranking(raw).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reasoning, "Great pick");
    }

    #[test]
    fn missing_closing_quote_is_repaired() {
        let raw = r#"[{"titleId": 1, "score": 80, "reasoning": "Great pick}]"#;
        let entries = parse_ranking(raw).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reasoning, "Great pick");
    }

    #[test]
    fn no_array_is_a_distinct_error() {
        assert_eq!(
            parse_ranking("I cannot rank these titles."),
            Err(RankingError::NoJsonArray)
        );
        assert_eq!(parse_ranking("] oops ["), Err(RankingError::NoJsonArray));
    }

    #[test]
    fn hopeless_output_is_unparseable() {
        assert_eq!(
            parse_ranking("[this is not json at all]"),
            Err(RankingError::Unparseable)
        );
    }

    #[test]
    fn invalid_entries_are_dropped_valid_survive() {
        let raw = r#"[
            {"titleId": 1, "score": 90, "reasoning": "good"},
            {"titleId": "two", "score": 80, "reasoning": "bad id"},
            {"score": 70, "reasoning": "missing id"},
            {"titleId": 4, "score": 60, "reasoning": "also good"}
        ]"#;
        let entries = parse_ranking(raw).unwrap();

        let ids: Vec<i32> = entries.iter().map(|e| e.title_id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn empty_array_is_valid_and_empty() {
        assert_eq!(parse_ranking("[]").unwrap(), Vec::new());
    }

    fn scored(id: i32, title: &str) -> ScoredCandidate {
        ScoredCandidate {
            title: CatalogTitle {
                id,
                title: title.to_string(),
                release_date: Some("2014-11-05".to_string()),
                genre_ids: vec![878],
                overview: Some("A team travels through a wormhole.".to_string()),
                poster_path: Some("/poster.jpg".to_string()),
                vote_average: 8.4,
                vote_count: 30000,
                media_type: None,
            },
            review: Some(ReviewMatch {
                url: Some("https://example.org/interstellar".to_string()),
                rating: Some(5),
                excerpt: None,
            }),
            heuristic_score: 100.0,
        }
    }

    fn entry(id: i32, score: f64) -> RankedEntry {
        RankedEntry {
            title_id: id,
            score,
            reasoning: "reason".to_string(),
        }
    }

    #[test]
    fn merge_drops_unknown_ids_and_keeps_first_occurrence() {
        let entries = vec![entry(1, 80.0), entry(99, 95.0), entry(1, 10.0)];
        let merged = merge_ranked(entries, vec![scored(1, "Interstellar")], TitleKind::Film);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].tmdb_id, 1);
        assert!((merged[0].score - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn merge_sorts_by_model_score_descending() {
        let entries = vec![entry(1, 70.0), entry(2, 90.0)];
        let candidates = vec![scored(1, "First"), scored(2, "Second")];
        let merged = merge_ranked(entries, candidates, TitleKind::Film);

        assert_eq!(merged[0].tmdb_id, 2);
        assert_eq!(merged[1].tmdb_id, 1);
    }

    #[test]
    fn merge_carries_review_and_poster_fields() {
        let merged = merge_ranked(
            vec![entry(1, 88.0)],
            vec![scored(1, "Interstellar")],
            TitleKind::Film,
        );

        assert_eq!(merged[0].review_rating, Some(5));
        assert_eq!(
            merged[0].review_url.as_deref(),
            Some("https://example.org/interstellar")
        );
        assert_eq!(
            merged[0].poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w342/poster.jpg")
        );
        assert_eq!(merged[0].release_year, Some(2014));
    }

    #[test]
    fn prompt_contains_bounded_context_sections() {
        let genre_names: HashMap<i32, String> =
            [(878, "Science Fiction".to_string())].into_iter().collect();
        let history = vec![HistoryItem {
            tmdb_id: 27205,
            title: "Inception".to_string(),
            kind: TitleKind::Film,
            release_year: Some(2010),
            genres: vec![878],
            poster_url: None,
            rating: 5,
            notes: Some("mind-bending".to_string()),
            watched_at: "2024-01-01T00:00:00Z".to_string(),
        }];
        let candidates = vec![scored(157336, "Interstellar")];

        let prompt = build_prompt(&history, &[], &[], &candidates, &genre_names, 20);

        assert!(prompt.contains("\"Inception\" (2010) [Science Fiction] - 5/5 stars - Notes: mind-bending"));
        assert!(prompt.contains("[ID:157336]"));
        assert!(prompt.contains("| TMDB: 8.4/10"));
        assert!(prompt.contains("Guardian: 5/5 stars"));
        assert!(prompt.contains("top 20 titles"));
        assert!(prompt.contains("## Recently Dismissed"));
    }
}
