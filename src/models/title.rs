use serde::{Deserialize, Serialize};

use crate::clients::tmdb::poster_url;
use crate::domain::TitleKind;
use crate::models::catalog::CatalogTitle;

/// Catalog metadata written to the title store. Review fields are managed
/// separately and never clobbered by a metadata upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleUpsert {
    pub tmdb_id: i32,
    pub title: String,
    pub kind: TitleKind,
    pub release_year: Option<i32>,
    pub genres: Vec<i32>,
    pub poster_url: Option<String>,
    pub overview: Option<String>,
}

impl TitleUpsert {
    /// Poster paths are expanded to full image URLs before storage, so rows
    /// read back for display need no further catalog knowledge.
    #[must_use]
    pub fn from_catalog(candidate: &CatalogTitle, kind: TitleKind) -> Self {
        Self {
            tmdb_id: candidate.id,
            title: candidate.title.clone(),
            kind,
            release_year: candidate.release_year(),
            genres: candidate.genre_ids.clone(),
            poster_url: poster_url(candidate.poster_path.as_deref()),
            overview: candidate.overview.clone(),
        }
    }
}
