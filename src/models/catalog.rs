use serde::{Deserialize, Serialize};

/// One row of a catalog search/similar/discover response. Film and series
/// payloads differ in field names; aliases unify them into a single shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogTitle {
    pub id: i32,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default, alias = "first_air_date")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u32,
    /// Only present in mixed search results ("movie", "tv", "person").
    #[serde(default)]
    pub media_type: Option<String>,
}

impl CatalogTitle {
    /// Year component of the release date, when one is present and sane.
    #[must_use]
    pub fn release_year(&self) -> Option<i32> {
        self.release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogGenre {
    pub id: i32,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_year_parses_date_prefix() {
        let title = CatalogTitle {
            id: 27205,
            title: "Inception".to_string(),
            release_date: Some("2010-07-16".to_string()),
            genre_ids: vec![878, 53],
            overview: None,
            poster_path: None,
            vote_average: 8.4,
            vote_count: 34000,
            media_type: None,
        };
        assert_eq!(title.release_year(), Some(2010));
    }

    #[test]
    fn release_year_tolerates_missing_or_garbage_dates() {
        let mut title = CatalogTitle {
            id: 1,
            title: "Unknown".to_string(),
            release_date: None,
            genre_ids: vec![],
            overview: None,
            poster_path: None,
            vote_average: 0.0,
            vote_count: 0,
            media_type: None,
        };
        assert_eq!(title.release_year(), None);

        title.release_date = Some(String::new());
        assert_eq!(title.release_year(), None);

        title.release_date = Some("soon".to_string());
        assert_eq!(title.release_year(), None);
    }

    #[test]
    fn series_payload_aliases_deserialize() {
        let json = r#"{
            "id": 1396,
            "name": "Breaking Bad",
            "first_air_date": "2008-01-20",
            "genre_ids": [18, 80],
            "vote_average": 8.9,
            "vote_count": 12000
        }"#;
        let title: CatalogTitle = serde_json::from_str(json).unwrap();
        assert_eq!(title.title, "Breaking Bad");
        assert_eq!(title.release_year(), Some(2008));
    }
}
