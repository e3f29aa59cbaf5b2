use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

use crate::clients::ReviewClient;
use crate::config::GuardianConfig;
use crate::constants::{http, review};
use crate::domain::TitleKind;
use crate::models::review::ReviewMatch;

/// Section path prefixes in review ids, e.g. `film/2023/jul/19/oppenheimer-review`.
const FILM_SECTION: &str = "film/";
const SERIES_SECTION: &str = "tv-and-radio/";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: ResponseBody,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    results: Vec<Review>,
}

#[derive(Debug, Deserialize)]
struct Review {
    id: String,
    #[serde(rename = "webTitle")]
    web_title: String,
    #[serde(rename = "webUrl")]
    web_url: String,
    #[serde(default)]
    fields: Option<ReviewFields>,
}

#[derive(Debug, Default, Deserialize)]
struct ReviewFields {
    #[serde(rename = "starRating")]
    star_rating: Option<String>,
    #[serde(rename = "trailText")]
    trail_text: Option<String>,
}

#[derive(Clone)]
pub struct GuardianClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GuardianClient {
    #[must_use]
    pub fn new(config: &GuardianConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(http::REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    async fn search(&self, query: &str, kind: Option<TitleKind>) -> Result<Vec<Review>> {
        let mut url = format!(
            "{}/search?api-key={}&q={}&show-fields=starRating,trailText,body&page-size={}&order-by=relevance",
            self.base_url,
            self.api_key,
            urlencoding::encode(query),
            review::PAGE_SIZE
        );

        match kind {
            Some(TitleKind::Film) => url.push_str("&section=film"),
            Some(TitleKind::Series) => url.push_str("&section=tv-and-radio"),
            None => url.push_str("&tag=film/film,tv-and-radio/tv-and-radio"),
        }

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Guardian API error: {} - {}", status, body));
        }

        let response: SearchResponse = response.json().await?;
        Ok(response.response.results)
    }
}

#[async_trait::async_trait]
impl ReviewClient for GuardianClient {
    async fn best_review(
        &self,
        title: &str,
        year: Option<i32>,
        kind: Option<TitleKind>,
    ) -> Result<Option<ReviewMatch>> {
        let mut query = title.to_string();
        if let Some(year) = year {
            query.push_str(&format!(" {year}"));
        }
        // Series reviews rarely carry the bare title; the hint narrows the
        // search to coverage of the show itself.
        if kind == Some(TitleKind::Series) {
            query.push_str(" tv series");
        }

        let results = self.search(&query, kind).await?;

        let matches: Vec<&Review> = results
            .iter()
            .filter(|r| section_matches(kind, &r.id))
            .filter(|r| title_matches(title, &r.web_title))
            .collect();

        let best = matches
            .iter()
            .find(|r| {
                r.fields
                    .as_ref()
                    .is_some_and(|f| f.star_rating.is_some())
            })
            .or_else(|| matches.first());

        Ok(best.map(|r| {
            let fields = r.fields.as_ref();
            ReviewMatch {
                url: Some(r.web_url.clone()),
                rating: fields
                    .and_then(|f| f.star_rating.as_deref())
                    .and_then(extract_star_rating),
                excerpt: fields.and_then(|f| f.trail_text.clone()),
            }
        }))
    }
}

/// Whether a review's section path is acceptable for the requested kind.
/// Cross-section hits are rejected even when textually relevant.
fn section_matches(kind: Option<TitleKind>, review_id: &str) -> bool {
    match kind {
        Some(TitleKind::Film) => review_id.starts_with(FILM_SECTION),
        Some(TitleKind::Series) => review_id.starts_with(SERIES_SECTION),
        None => review_id.starts_with(FILM_SECTION) || review_id.starts_with(SERIES_SECTION),
    }
}

/// Lowercases and collapses punctuation, dashes, and whitespace runs into
/// single spaces.
fn normalize_title(raw: &str) -> String {
    let lowered: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Accepts a review headline for a target title if the normalized target is a
/// substring of the normalized headline, or if at least 70% of the target's
/// significant words appear among the headline's words.
fn title_matches(target: &str, headline: &str) -> bool {
    let target = normalize_title(target);
    let headline = normalize_title(headline);

    if target.is_empty() {
        return false;
    }

    if headline.contains(&target) {
        return true;
    }

    let significant: Vec<&str> = target.split(' ').filter(|w| w.len() > 2).collect();
    if significant.is_empty() {
        return false;
    }

    let headline_words: Vec<&str> = headline.split(' ').collect();
    let matched = significant
        .iter()
        .copied()
        .filter(|w| headline_words.contains(w))
        .count();

    matched as f64 / significant.len() as f64 >= 0.7
}

/// Parses a star rating string into 1-5; anything else is "no rating".
fn extract_star_rating(raw: &str) -> Option<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|r| (1..=5).contains(r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_punctuation_and_whitespace() {
        assert_eq!(
            normalize_title("Mission: Impossible --  Dead Reckoning"),
            "mission impossible dead reckoning"
        );
        assert_eq!(normalize_title("  WALL-E  "), "wall e");
    }

    #[test]
    fn substring_match_accepts_review_headline() {
        assert!(title_matches(
            "Oppenheimer",
            "Oppenheimer review: a towering achievement"
        ));
    }

    #[test]
    fn low_word_overlap_rejects() {
        assert!(!title_matches("Barbenheimer", "Barbie review"));
    }

    #[test]
    fn word_overlap_at_threshold_accepts() {
        // All four significant words present, "at" is too short to count.
        assert!(title_matches(
            "Everything Everywhere All at Once",
            "Everything Everywhere All at Once review - a delirious multiverse"
        ));
        // Only 2 of 6 significant words present.
        assert!(!title_matches(
            "Mission Impossible Dead Reckoning Part One",
            "Impossible missions of cinema: part review"
        ));
    }

    #[test]
    fn empty_target_never_matches() {
        assert!(!title_matches("", "Oppenheimer review"));
        assert!(!title_matches("!!", "Oppenheimer review"));
    }

    #[test]
    fn section_filter_rejects_cross_section_hits() {
        let film_id = "film/2023/jul/19/oppenheimer-review";
        let tv_id = "tv-and-radio/2023/jan/15/the-last-of-us-review";

        assert!(section_matches(Some(TitleKind::Film), film_id));
        assert!(!section_matches(Some(TitleKind::Film), tv_id));
        assert!(section_matches(Some(TitleKind::Series), tv_id));
        assert!(!section_matches(Some(TitleKind::Series), film_id));
        assert!(section_matches(None, film_id));
        assert!(section_matches(None, tv_id));
        assert!(!section_matches(None, "music/2023/some-album-review"));
    }

    #[test]
    fn star_rating_parses_only_one_through_five() {
        assert_eq!(extract_star_rating("4"), Some(4));
        assert_eq!(extract_star_rating(" 5 "), Some(5));
        assert_eq!(extract_star_rating("0"), None);
        assert_eq!(extract_star_rating("6"), None);
        assert_eq!(extract_star_rating("four"), None);
        assert_eq!(extract_star_rating(""), None);
    }
}
