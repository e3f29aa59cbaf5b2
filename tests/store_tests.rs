//! Store-level integration tests over a temporary sqlite database.

use watchnext::db::{Store, StoreError};
use watchnext::domain::TitleKind;
use watchnext::models::title::TitleUpsert;

async fn temp_store() -> Store {
    let db_path = std::env::temp_dir().join(format!(
        "watchnext-store-test-{}.db",
        uuid::Uuid::new_v4()
    ));
    Store::new(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("failed to open temp store")
}

fn film(tmdb_id: i32, title: &str, year: i32) -> TitleUpsert {
    TitleUpsert {
        tmdb_id,
        title: title.to_string(),
        kind: TitleKind::Film,
        release_year: Some(year),
        genres: vec![878, 53],
        poster_url: None,
        overview: Some("A placeholder overview.".to_string()),
    }
}

fn series(tmdb_id: i32, title: &str, year: i32) -> TitleUpsert {
    TitleUpsert {
        kind: TitleKind::Series,
        ..film(tmdb_id, title, year)
    }
}

#[tokio::test]
async fn watchlist_rejects_duplicate_adds() {
    let store = temp_store().await;
    store
        .upsert_user("viewer", None, None)
        .await
        .expect("seed user");
    let title = store
        .upsert_title(&film(27205, "Inception", 2010))
        .await
        .expect("seed title");

    store
        .add_to_watchlist("viewer", title.id, TitleKind::Film)
        .await
        .expect("first add should succeed");

    let err = store
        .add_to_watchlist("viewer", title.id, TitleKind::Film)
        .await
        .expect_err("second add must conflict");
    assert!(matches!(err, StoreError::Duplicate));

    let items = store
        .get_watchlist("viewer", None)
        .await
        .expect("list watchlist");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].tmdb_id, 27205);
}

#[tokio::test]
async fn recording_a_watch_clears_the_watchlist_entry() {
    let store = temp_store().await;
    store
        .upsert_user("viewer", None, None)
        .await
        .expect("seed user");
    let title = store
        .upsert_title(&film(157336, "Interstellar", 2014))
        .await
        .expect("seed title");

    store
        .add_to_watchlist("viewer", title.id, TitleKind::Film)
        .await
        .expect("add to watchlist");
    assert!(
        store
            .watchlist_contains("viewer", title.id)
            .await
            .expect("contains before watch")
    );

    store
        .record_watch("viewer", title.id, TitleKind::Film, 5, Some("stunning"))
        .await
        .expect("record watch");

    assert!(
        !store
            .watchlist_contains("viewer", title.id)
            .await
            .expect("contains after watch")
    );

    let history = store
        .get_history("viewer", None, None)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].tmdb_id, 157336);
    assert_eq!(history[0].rating, 5);
    assert_eq!(history[0].notes.as_deref(), Some("stunning"));
    assert_eq!(history[0].genres, vec![878, 53]);
}

#[tokio::test]
async fn rewatching_overwrites_the_existing_entry() {
    let store = temp_store().await;
    store
        .upsert_user("viewer", None, None)
        .await
        .expect("seed user");
    let title = store
        .upsert_title(&film(603, "The Matrix", 1999))
        .await
        .expect("seed title");

    store
        .record_watch("viewer", title.id, TitleKind::Film, 4, Some("first pass"))
        .await
        .expect("first watch");
    store
        .record_watch(
            "viewer",
            title.id,
            TitleKind::Film,
            5,
            Some("even better on rewatch"),
        )
        .await
        .expect("second watch");

    let history = store
        .get_history("viewer", None, None)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].rating, 5);
    assert_eq!(history[0].notes.as_deref(), Some("even better on rewatch"));
}

#[tokio::test]
async fn metadata_upsert_preserves_review_columns() {
    let store = temp_store().await;
    store
        .upsert_title(&film(693134, "Dune: Part Two", 2024))
        .await
        .expect("seed title");

    store
        .set_title_review(
            693134,
            Some(5),
            Some("https://example.org/dune-part-two-review"),
            Some("A towering sci-fi epic"),
        )
        .await
        .expect("store review");

    let mut refreshed = film(693134, "Dune: Part Two", 2024);
    refreshed.overview = Some("Paul Atreides unites with the Fremen.".to_string());
    let model = store
        .upsert_title(&refreshed)
        .await
        .expect("metadata refresh");

    assert_eq!(model.review_rating, Some(5));
    assert_eq!(
        model.review_url.as_deref(),
        Some("https://example.org/dune-part-two-review")
    );
    assert_eq!(
        model.overview.as_deref(),
        Some("Paul Atreides unites with the Fremen.")
    );
}

#[tokio::test]
async fn rated_at_least_is_kind_scoped_and_filtered() {
    let store = temp_store().await;
    store
        .upsert_user("viewer", None, None)
        .await
        .expect("seed user");

    let loved = store
        .upsert_title(&film(27205, "Inception", 2010))
        .await
        .expect("seed loved");
    let meh = store
        .upsert_title(&film(605, "The Matrix Revolutions", 2003))
        .await
        .expect("seed meh");
    let liked = store
        .upsert_title(&film(157336, "Interstellar", 2014))
        .await
        .expect("seed liked");
    let show = store
        .upsert_title(&series(1396, "Breaking Bad", 2008))
        .await
        .expect("seed series");

    for (title_id, kind, rating) in [
        (loved.id, TitleKind::Film, 5),
        (meh.id, TitleKind::Film, 3),
        (liked.id, TitleKind::Film, 4),
        (show.id, TitleKind::Series, 5),
    ] {
        store
            .record_watch("viewer", title_id, kind, rating, None)
            .await
            .expect("record watch");
    }

    let highly_rated = store
        .history_rated_at_least("viewer", TitleKind::Film, 4, None)
        .await
        .expect("rated at least");

    let tmdb_ids: Vec<i32> = highly_rated.iter().map(|item| item.tmdb_id).collect();
    assert_eq!(tmdb_ids.len(), 2);
    assert!(tmdb_ids.contains(&27205));
    assert!(tmdb_ids.contains(&157336));
    assert!(highly_rated.iter().all(|item| item.rating >= 4));
}

#[tokio::test]
async fn dismissed_ids_are_kind_scoped() {
    let store = temp_store().await;
    store
        .upsert_user("viewer", None, None)
        .await
        .expect("seed user");

    let endgame = store
        .upsert_title(&film(299534, "Avengers: Endgame", 2019))
        .await
        .expect("seed film");
    let show = store
        .upsert_title(&series(94997, "House of the Dragon", 2022))
        .await
        .expect("seed series");

    store
        .dismiss("viewer", endgame.id, endgame.tmdb_id, TitleKind::Film)
        .await
        .expect("dismiss film");
    store
        .dismiss("viewer", show.id, show.tmdb_id, TitleKind::Series)
        .await
        .expect("dismiss series");

    let film_ids = store
        .dismissed_tmdb_ids("viewer", TitleKind::Film)
        .await
        .expect("film dismissals");
    assert_eq!(film_ids, vec![299534]);

    let all = store
        .get_dismissed("viewer", None, None)
        .await
        .expect("all dismissals");
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn undismiss_reports_whether_anything_was_removed() {
    let store = temp_store().await;
    store
        .upsert_user("viewer", None, None)
        .await
        .expect("seed user");
    let title = store
        .upsert_title(&film(299534, "Avengers: Endgame", 2019))
        .await
        .expect("seed title");

    store
        .dismiss("viewer", title.id, title.tmdb_id, TitleKind::Film)
        .await
        .expect("dismiss");

    assert!(
        store
            .undismiss("viewer", 299534)
            .await
            .expect("first undismiss")
    );
    assert!(
        !store
            .undismiss("viewer", 299534)
            .await
            .expect("second undismiss")
    );
}

#[tokio::test]
async fn reviewed_titles_returns_only_rows_with_ratings() {
    let store = temp_store().await;

    store
        .upsert_title(&film(27205, "Inception", 2010))
        .await
        .expect("seed reviewed");
    store
        .upsert_title(&film(157336, "Interstellar", 2014))
        .await
        .expect("seed checked");
    store
        .upsert_title(&film(603, "The Matrix", 1999))
        .await
        .expect("seed unchecked");

    store
        .set_title_review(27205, Some(4), Some("https://example.org/inception"), None)
        .await
        .expect("store rating");
    store
        .mark_title_review_checked(157336)
        .await
        .expect("mark checked without rating");

    let reviewed = store
        .reviewed_titles(&[27205, 157336, 603, 999_999])
        .await
        .expect("reviewed lookup");

    assert_eq!(reviewed.len(), 1);
    assert_eq!(reviewed[0].tmdb_id, 27205);
    assert_eq!(reviewed[0].review_rating, Some(4));

    let checked = store
        .get_title_by_tmdb_id(157336)
        .await
        .expect("fetch checked row")
        .expect("checked row exists");
    assert!(checked.review_checked_at.is_some());
    assert!(checked.review_rating.is_none());
}
