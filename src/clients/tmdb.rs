use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::clients::{CatalogClient, DiscoverParams};
use crate::config::TmdbConfig;
use crate::constants::http;
use crate::domain::TitleKind;
use crate::models::catalog::{CatalogGenre, CatalogTitle};

const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w342";

#[derive(Debug, Deserialize)]
struct PagedResponse {
    #[serde(default)]
    results: Vec<CatalogTitle>,
}

#[derive(Debug, Deserialize)]
struct GenreListResponse {
    #[serde(default)]
    genres: Vec<CatalogGenre>,
}

/// Detail endpoints return resolved genre objects instead of the id array
/// the list endpoints use.
#[derive(Debug, Deserialize)]
struct DetailsPayload {
    id: i32,
    #[serde(alias = "name")]
    title: String,
    #[serde(default, alias = "first_air_date")]
    release_date: Option<String>,
    #[serde(default)]
    genres: Vec<CatalogGenre>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    vote_count: u32,
}

impl DetailsPayload {
    fn into_title(self, kind: TitleKind) -> CatalogTitle {
        CatalogTitle {
            id: self.id,
            title: self.title,
            release_date: self.release_date,
            genre_ids: self.genres.into_iter().map(|g| g.id).collect(),
            overview: self.overview,
            poster_path: self.poster_path,
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            media_type: Some(media_path(kind).to_string()),
        }
    }
}

/// The catalog's path segment for a title kind.
const fn media_path(kind: TitleKind) -> &'static str {
    match kind {
        TitleKind::Film => "movie",
        TitleKind::Series => "tv",
    }
}

/// Full poster image URL for a catalog poster path.
#[must_use]
pub fn poster_url(path: Option<&str>) -> Option<String> {
    path.map(|p| format!("{POSTER_BASE}{p}"))
}

#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    #[must_use]
    pub fn new(config: &TmdbConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(http::REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("TMDB API error: {} - {}", status, body));
        }

        Ok(response.json().await?)
    }

    fn url(&self, endpoint: &str, params: &str) -> String {
        format!(
            "{}{}?api_key={}{}",
            self.base_url, endpoint, self.api_key, params
        )
    }
}

#[async_trait::async_trait]
impl CatalogClient for TmdbClient {
    async fn search_multi(&self, query: &str, page: u32) -> Result<Vec<CatalogTitle>> {
        let url = self.url(
            "/search/multi",
            &format!(
                "&query={}&page={}&include_adult=false",
                urlencoding::encode(query),
                page
            ),
        );
        let response: PagedResponse = self.get_json(&url).await?;

        // Multi search interleaves people with titles; keep only titles.
        Ok(response
            .results
            .into_iter()
            .filter(|t| {
                matches!(t.media_type.as_deref(), Some("movie") | Some("tv"))
            })
            .collect())
    }

    async fn search_films(&self, query: &str, page: u32) -> Result<Vec<CatalogTitle>> {
        let url = self.url(
            "/search/movie",
            &format!(
                "&query={}&page={}&include_adult=false",
                urlencoding::encode(query),
                page
            ),
        );
        let response: PagedResponse = self.get_json(&url).await?;
        Ok(response.results)
    }

    async fn search_series(&self, query: &str, page: u32) -> Result<Vec<CatalogTitle>> {
        let url = self.url(
            "/search/tv",
            &format!(
                "&query={}&page={}&include_adult=false",
                urlencoding::encode(query),
                page
            ),
        );
        let response: PagedResponse = self.get_json(&url).await?;
        Ok(response.results)
    }

    async fn details(&self, kind: TitleKind, tmdb_id: i32) -> Result<Option<CatalogTitle>> {
        let url = self.url(&format!("/{}/{}", media_path(kind), tmdb_id), "");
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("TMDB API error: {} - {}", status, body));
        }

        let payload: DetailsPayload = response.json().await?;
        Ok(Some(payload.into_title(kind)))
    }

    async fn genres(&self, kind: TitleKind) -> Result<Vec<CatalogGenre>> {
        let url = self.url(&format!("/genre/{}/list", media_path(kind)), "");
        let response: GenreListResponse = self.get_json(&url).await?;
        Ok(response.genres)
    }

    async fn similar(&self, kind: TitleKind, tmdb_id: i32, page: u32) -> Result<Vec<CatalogTitle>> {
        let url = self.url(
            &format!("/{}/{}/similar", media_path(kind), tmdb_id),
            &format!("&language=en-US&page={page}"),
        );
        let response: PagedResponse = self.get_json(&url).await?;
        Ok(response.results)
    }

    async fn discover(&self, kind: TitleKind, params: &DiscoverParams) -> Result<Vec<CatalogTitle>> {
        let mut query = format!("&language=en-US&page={}", params.page.max(1));

        if let Some(sort_by) = &params.sort_by {
            query.push_str(&format!("&sort_by={sort_by}"));
        }
        if let Some(min_votes) = params.min_vote_count {
            query.push_str(&format!("&vote_count.gte={min_votes}"));
        }
        if let Some(min_average) = params.min_vote_average {
            query.push_str(&format!("&vote_average.gte={min_average}"));
        }
        if let Some(from) = &params.release_date_from {
            // The discover endpoint names its date filter differently per kind.
            let field = match kind {
                TitleKind::Film => "primary_release_date.gte",
                TitleKind::Series => "first_air_date.gte",
            };
            query.push_str(&format!("&{field}={from}"));
        }
        if !params.genres.is_empty() {
            let ids = params
                .genres
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            query.push_str(&format!("&with_genres={ids}"));
        }

        let url = self.url(&format!("/discover/{}", media_path(kind)), &query);
        let response: PagedResponse = self.get_json(&url).await?;
        Ok(response.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_path_maps_kinds() {
        assert_eq!(media_path(TitleKind::Film), "movie");
        assert_eq!(media_path(TitleKind::Series), "tv");
    }

    #[test]
    fn poster_url_joins_base_and_path() {
        assert_eq!(
            poster_url(Some("/abc123.jpg")).as_deref(),
            Some("https://image.tmdb.org/t/p/w342/abc123.jpg")
        );
        assert_eq!(poster_url(None), None);
    }

    #[test]
    fn paged_response_tolerates_missing_results() {
        let response: PagedResponse = serde_json::from_str("{\"page\": 1}").unwrap();
        assert!(response.results.is_empty());
    }

    #[test]
    fn details_payload_unifies_series_fields() {
        let json = r#"{
            "id": 1396,
            "name": "Breaking Bad",
            "first_air_date": "2008-01-20",
            "genres": [{"id": 18, "name": "Drama"}, {"id": 80, "name": "Crime"}],
            "vote_average": 8.9,
            "vote_count": 12000
        }"#;
        let payload: DetailsPayload = serde_json::from_str(json).unwrap();
        let title = payload.into_title(TitleKind::Series);
        assert_eq!(title.title, "Breaking Bad");
        assert_eq!(title.genre_ids, vec![18, 80]);
        assert_eq!(title.media_type.as_deref(), Some("tv"));
    }
}
