use serde::{Deserialize, Serialize};

use crate::domain::TitleKind;

/// A watch-history entry joined with its title row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub tmdb_id: i32,
    pub title: String,
    pub kind: TitleKind,
    pub release_year: Option<i32>,
    pub genres: Vec<i32>,
    pub poster_url: Option<String>,
    pub rating: i32,
    pub notes: Option<String>,
    pub watched_at: String,
}

/// A watchlist entry joined with its title row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub tmdb_id: i32,
    pub title: String,
    pub kind: TitleKind,
    pub release_year: Option<i32>,
    pub poster_url: Option<String>,
    pub added_at: String,
}

/// A dismissed recommendation joined with its title row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DismissedItem {
    pub tmdb_id: i32,
    pub title: String,
    pub kind: TitleKind,
    pub release_year: Option<i32>,
    pub dismissed_at: String,
}
