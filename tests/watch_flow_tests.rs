//! Watch-service flow tests: watchlist, history, dismissals, and the
//! background review backfill, over a real store and fake clients.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use watchnext::clients::{CatalogClient, DiscoverParams, ReviewClient};
use watchnext::config::RecommendationsConfig;
use watchnext::db::Store;
use watchnext::domain::{TitleKind, TmdbId, UserId};
use watchnext::entities::titles;
use watchnext::models::catalog::{CatalogGenre, CatalogTitle};
use watchnext::models::review::ReviewMatch;
use watchnext::services::{SeaOrmWatchService, WatchError, WatchService};

#[derive(Default)]
struct FakeCatalog {
    details: HashMap<i32, CatalogTitle>,
    films: Vec<CatalogTitle>,
    multi: Vec<CatalogTitle>,
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn search_multi(&self, _query: &str, _page: u32) -> Result<Vec<CatalogTitle>> {
        Ok(self.multi.clone())
    }

    async fn search_films(&self, _query: &str, _page: u32) -> Result<Vec<CatalogTitle>> {
        Ok(self.films.clone())
    }

    async fn search_series(&self, _query: &str, _page: u32) -> Result<Vec<CatalogTitle>> {
        Ok(Vec::new())
    }

    async fn details(&self, _kind: TitleKind, tmdb_id: i32) -> Result<Option<CatalogTitle>> {
        Ok(self.details.get(&tmdb_id).cloned())
    }

    async fn genres(&self, _kind: TitleKind) -> Result<Vec<CatalogGenre>> {
        Ok(Vec::new())
    }

    async fn similar(
        &self,
        _kind: TitleKind,
        _tmdb_id: i32,
        _page: u32,
    ) -> Result<Vec<CatalogTitle>> {
        Ok(Vec::new())
    }

    async fn discover(
        &self,
        _kind: TitleKind,
        _params: &DiscoverParams,
    ) -> Result<Vec<CatalogTitle>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct FakeReviews {
    by_title: HashMap<String, ReviewMatch>,
}

#[async_trait]
impl ReviewClient for FakeReviews {
    async fn best_review(
        &self,
        title: &str,
        _year: Option<i32>,
        _kind: Option<TitleKind>,
    ) -> Result<Option<ReviewMatch>> {
        Ok(self.by_title.get(title).cloned())
    }
}

fn catalog_film(id: i32, title: &str, date: &str) -> CatalogTitle {
    CatalogTitle {
        id,
        title: title.to_string(),
        release_date: Some(date.to_string()),
        genre_ids: vec![878],
        overview: Some(format!("{title} overview.")),
        poster_path: Some(format!("/{id}.jpg")),
        vote_average: 7.0,
        vote_count: 1000,
        media_type: None,
    }
}

struct WatchHarness {
    store: Store,
    service: SeaOrmWatchService,
    user: UserId,
}

async fn watch_harness() -> WatchHarness {
    let db_path = std::env::temp_dir().join(format!(
        "watchnext-watch-test-{}.db",
        uuid::Uuid::new_v4()
    ));
    let store = Store::new(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("failed to open temp store");

    let dune = catalog_film(693134, "Dune: Part Two", "2024-02-27");
    let sixty_five = catalog_film(700391, "65", "2023-03-02");
    let matrix = catalog_film(603, "The Matrix", "1999-03-30");

    let mut catalog = FakeCatalog::default();
    for title in [&dune, &sixty_five, &matrix] {
        catalog.details.insert(title.id, title.clone());
    }
    catalog.films = vec![dune.clone()];
    catalog.multi = vec![dune, matrix];

    let mut reviews = FakeReviews::default();
    reviews.by_title.insert(
        "Dune: Part Two".to_string(),
        ReviewMatch {
            url: Some("https://example.org/film/dune-part-two-review".to_string()),
            rating: Some(5),
            excerpt: Some("A towering sequel.".to_string()),
        },
    );
    reviews.by_title.insert(
        "65".to_string(),
        ReviewMatch {
            url: Some("https://example.org/film/65-review".to_string()),
            rating: Some(2),
            excerpt: None,
        },
    );

    let service = SeaOrmWatchService::new(
        store.clone(),
        Arc::new(catalog) as Arc<dyn CatalogClient>,
        Arc::new(reviews) as Arc<dyn ReviewClient>,
        RecommendationsConfig::default(),
    );

    WatchHarness {
        store,
        service,
        user: UserId::new("tester".to_string()),
    }
}

/// The review backfill runs on a detached task; poll until it has recorded
/// an outcome on the title row.
async fn wait_for_review_check(store: &Store, tmdb_id: i32) -> titles::Model {
    for _ in 0..200 {
        let row = store
            .get_title_by_tmdb_id(tmdb_id)
            .await
            .expect("title lookup")
            .expect("title row exists");
        if row.review_checked_at.is_some() {
            return row;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("review check for {tmdb_id} never completed");
}

#[tokio::test]
async fn duplicate_watchlist_add_is_a_conflict() {
    let harness = watch_harness().await;

    harness
        .service
        .add_to_watchlist(&harness.user, TmdbId::new(693134), TitleKind::Film)
        .await
        .expect("first add");

    let err = harness
        .service
        .add_to_watchlist(&harness.user, TmdbId::new(693134), TitleKind::Film)
        .await
        .expect_err("second add must conflict");
    assert!(matches!(err, WatchError::AlreadyInWatchlist(_)));

    let items = harness
        .service
        .watchlist(&harness.user, None)
        .await
        .expect("watchlist");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Dune: Part Two");
}

#[tokio::test]
async fn watchlist_membership_tracks_add_and_remove() {
    let harness = watch_harness().await;
    let dune = TmdbId::new(693134);

    assert!(
        !harness
            .service
            .watchlist_contains(&harness.user, dune)
            .await
            .expect("contains before add")
    );

    harness
        .service
        .add_to_watchlist(&harness.user, dune, TitleKind::Film)
        .await
        .expect("add");
    assert!(
        harness
            .service
            .watchlist_contains(&harness.user, dune)
            .await
            .expect("contains after add")
    );

    harness
        .service
        .remove_from_watchlist(&harness.user, dune)
        .await
        .expect("remove");
    assert!(
        !harness
            .service
            .watchlist_contains(&harness.user, dune)
            .await
            .expect("contains after remove")
    );

    let err = harness
        .service
        .remove_from_watchlist(&harness.user, dune)
        .await
        .expect_err("second remove must miss");
    assert!(matches!(err, WatchError::NotFound(_)));
}

#[tokio::test]
async fn watchlist_add_backfills_a_highly_rated_review() {
    let harness = watch_harness().await;

    harness
        .service
        .add_to_watchlist(&harness.user, TmdbId::new(693134), TitleKind::Film)
        .await
        .expect("add to watchlist");

    let row = wait_for_review_check(&harness.store, 693134).await;
    assert_eq!(row.review_rating, Some(5));
    assert_eq!(
        row.review_url.as_deref(),
        Some("https://example.org/film/dune-part-two-review")
    );
}

#[tokio::test]
async fn low_rated_reviews_are_checked_but_not_stored() {
    let harness = watch_harness().await;

    harness
        .service
        .add_to_watchlist(&harness.user, TmdbId::new(700391), TitleKind::Film)
        .await
        .expect("add to watchlist");

    let row = wait_for_review_check(&harness.store, 700391).await;
    assert!(row.review_rating.is_none());
    assert!(row.review_url.is_none());
}

#[tokio::test]
async fn titles_missing_from_the_catalog_are_not_found() {
    let harness = watch_harness().await;

    let err = harness
        .service
        .mark_watched(&harness.user, TmdbId::new(1), TitleKind::Film, 5, None)
        .await
        .expect_err("unknown title");
    assert!(matches!(err, WatchError::NotFound(_)));

    let err = harness
        .service
        .add_to_watchlist(&harness.user, TmdbId::new(1), TitleKind::Film)
        .await
        .expect_err("unknown title");
    assert!(matches!(err, WatchError::NotFound(_)));
}

#[tokio::test]
async fn out_of_range_ratings_are_rejected() {
    let harness = watch_harness().await;

    for rating in [0, 6, -3] {
        let err = harness
            .service
            .mark_watched(&harness.user, TmdbId::new(603), TitleKind::Film, rating, None)
            .await
            .expect_err("invalid rating");
        assert!(matches!(err, WatchError::InvalidRating(r) if r == rating));
    }

    let history = harness
        .service
        .history(&harness.user, None, None)
        .await
        .expect("history");
    assert!(history.is_empty());
}

#[tokio::test]
async fn dismissing_twice_is_a_conflict() {
    let harness = watch_harness().await;

    harness
        .service
        .dismiss(&harness.user, TmdbId::new(603), TitleKind::Film)
        .await
        .expect("first dismiss");

    let err = harness
        .service
        .dismiss(&harness.user, TmdbId::new(603), TitleKind::Film)
        .await
        .expect_err("second dismiss must conflict");
    assert!(matches!(err, WatchError::AlreadyDismissed(_)));

    harness
        .service
        .undismiss(&harness.user, TmdbId::new(603))
        .await
        .expect("undismiss");

    let err = harness
        .service
        .undismiss(&harness.user, TmdbId::new(603))
        .await
        .expect_err("nothing left to undismiss");
    assert!(matches!(err, WatchError::NotFound(_)));
}

#[tokio::test]
async fn update_and_remove_watched_round_trip() {
    let harness = watch_harness().await;

    harness
        .service
        .mark_watched(
            &harness.user,
            TmdbId::new(603),
            TitleKind::Film,
            3,
            Some("slow start".to_string()),
        )
        .await
        .expect("mark watched");

    harness
        .service
        .update_watched(
            &harness.user,
            TmdbId::new(603),
            5,
            Some("kept thinking about it for days".to_string()),
        )
        .await
        .expect("update watched");

    let history = harness
        .service
        .history(&harness.user, None, None)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].rating, 5);
    assert_eq!(
        history[0].notes.as_deref(),
        Some("kept thinking about it for days")
    );

    let err = harness
        .service
        .update_watched(&harness.user, TmdbId::new(693134), 4, None)
        .await
        .expect_err("no history entry to update");
    assert!(matches!(err, WatchError::NotFound(_)));

    harness
        .service
        .remove_watched(&harness.user, TmdbId::new(603))
        .await
        .expect("remove watched");

    let history = harness
        .service
        .history(&harness.user, None, None)
        .await
        .expect("history after removal");
    assert!(history.is_empty());

    let err = harness
        .service
        .remove_watched(&harness.user, TmdbId::new(603))
        .await
        .expect_err("nothing left to remove");
    assert!(matches!(err, WatchError::NotFound(_)));
}

#[tokio::test]
async fn highly_rated_returns_only_strong_ratings() {
    let harness = watch_harness().await;

    harness
        .service
        .mark_watched(&harness.user, TmdbId::new(603), TitleKind::Film, 5, None)
        .await
        .expect("mark loved film");
    harness
        .service
        .mark_watched(&harness.user, TmdbId::new(700391), TitleKind::Film, 3, None)
        .await
        .expect("mark mediocre film");

    let seeds = harness
        .service
        .highly_rated(&harness.user, TitleKind::Film, None)
        .await
        .expect("highly rated");

    assert_eq!(seeds.len(), 1);
    assert_eq!(seeds[0].tmdb_id, 603);
}

#[tokio::test]
async fn search_scopes_by_kind() {
    let harness = watch_harness().await;

    let films = harness
        .service
        .search("dune", Some(TitleKind::Film))
        .await
        .expect("film search");
    assert_eq!(films.len(), 1);
    assert_eq!(films[0].title, "Dune: Part Two");

    let everything = harness.service.search("dune", None).await.expect("search");
    assert_eq!(everything.len(), 2);
}
