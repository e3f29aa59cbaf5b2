//! External API clients and the capability traits the pipeline consumes.
//!
//! The recommendation pipeline never talks to a concrete HTTP client
//! directly; it goes through [`CatalogClient`], [`ReviewClient`], and
//! [`RankingClient`], so tests can substitute deterministic fakes.

use anyhow::Result;

use crate::domain::TitleKind;
use crate::models::catalog::{CatalogGenre, CatalogTitle};
use crate::models::review::ReviewMatch;

pub mod claude;
pub mod guardian;
pub mod tmdb;

pub use claude::ClaudeClient;
pub use guardian::GuardianClient;
pub use tmdb::TmdbClient;

/// Filters for a catalog discovery query. Unset fields are omitted from the
/// request rather than sent as empty values.
#[derive(Debug, Clone, Default)]
pub struct DiscoverParams {
    /// Restrict to titles carrying any of these catalog genre ids.
    pub genres: Vec<i32>,
    pub min_vote_count: Option<u32>,
    pub min_vote_average: Option<f64>,
    /// Earliest release date, `YYYY-MM-DD`.
    pub release_date_from: Option<String>,
    /// Catalog sort key, e.g. `popularity.desc`.
    pub sort_by: Option<String>,
    pub page: u32,
}

/// Media catalog lookups (search, details, similar titles, discovery).
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// Searches films and series together, excluding non-title results.
    async fn search_multi(&self, query: &str, page: u32) -> Result<Vec<CatalogTitle>>;

    async fn search_films(&self, query: &str, page: u32) -> Result<Vec<CatalogTitle>>;

    async fn search_series(&self, query: &str, page: u32) -> Result<Vec<CatalogTitle>>;

    /// Full detail record for one title, including its resolved genre ids.
    /// `Ok(None)` when the catalog has no title with that id.
    async fn details(&self, kind: TitleKind, tmdb_id: i32) -> Result<Option<CatalogTitle>>;

    /// The catalog's genre id/name table for the given kind.
    async fn genres(&self, kind: TitleKind) -> Result<Vec<CatalogGenre>>;

    /// Titles the catalog considers similar to the given one.
    async fn similar(&self, kind: TitleKind, tmdb_id: i32, page: u32) -> Result<Vec<CatalogTitle>>;

    /// Filtered discovery listing.
    async fn discover(&self, kind: TitleKind, params: &DiscoverParams) -> Result<Vec<CatalogTitle>>;
}

/// Editorial review lookup: best matching review for a title, if any.
#[async_trait::async_trait]
pub trait ReviewClient: Send + Sync {
    /// Finds the best matching review for a title. `Ok(None)` means no
    /// sufficiently similar review exists, which is the common outcome.
    async fn best_review(
        &self,
        title: &str,
        year: Option<i32>,
        kind: Option<TitleKind>,
    ) -> Result<Option<ReviewMatch>>;
}

/// Single-turn completion against the ranking model.
#[async_trait::async_trait]
pub trait RankingClient: Send + Sync {
    /// Sends one user prompt and returns the first text block of the reply.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
