use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, SqlErr, Statement};
use thiserror::Error;
use tracing::info;

use crate::domain::TitleKind;
use crate::entities::{dismissed_recommendations, titles, users, watchlist};
use crate::models::title::TitleUpsert;
use crate::models::watch::{DismissedItem, HistoryItem, WatchlistItem};

pub mod migrator;
pub mod repositories;

/// Persistence failures, with unique-key conflicts kept distinguishable so
/// user actions can report "already there" instead of a generic error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate entry")]
    Duplicate,
    #[error("database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
            Self::Duplicate
        } else {
            Self::Database(err.to_string())
        }
    }
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn title_repo(&self) -> repositories::title::TitleRepository {
        repositories::title::TitleRepository::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn watchlist_repo(&self) -> repositories::watchlist::WatchlistRepository {
        repositories::watchlist::WatchlistRepository::new(self.conn.clone())
    }

    fn history_repo(&self) -> repositories::history::HistoryRepository {
        repositories::history::HistoryRepository::new(self.conn.clone())
    }

    fn dismissed_repo(&self) -> repositories::dismissed::DismissedRepository {
        repositories::dismissed::DismissedRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn upsert_user(
        &self,
        id: &str,
        email: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<()> {
        self.user_repo().upsert(id, email, display_name).await
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<users::Model>> {
        self.user_repo().get(id).await
    }

    // ========== Titles ==========

    pub async fn upsert_title(&self, title: &TitleUpsert) -> Result<titles::Model> {
        self.title_repo().upsert(title).await
    }

    pub async fn get_title_by_tmdb_id(&self, tmdb_id: i32) -> Result<Option<titles::Model>> {
        self.title_repo().get_by_tmdb_id(tmdb_id).await
    }

    pub async fn set_title_review(
        &self,
        tmdb_id: i32,
        rating: Option<i32>,
        url: Option<&str>,
        excerpt: Option<&str>,
    ) -> Result<()> {
        self.title_repo()
            .set_review(tmdb_id, rating, url, excerpt)
            .await
    }

    pub async fn mark_title_review_checked(&self, tmdb_id: i32) -> Result<()> {
        self.title_repo().mark_review_checked(tmdb_id).await
    }

    pub async fn reviewed_titles(&self, tmdb_ids: &[i32]) -> Result<Vec<titles::Model>> {
        self.title_repo().reviewed_titles(tmdb_ids).await
    }

    // ========== Watchlist ==========

    pub async fn add_to_watchlist(
        &self,
        user_id: &str,
        title_id: i32,
        kind: TitleKind,
    ) -> Result<watchlist::Model, StoreError> {
        self.watchlist_repo().add(user_id, title_id, kind).await
    }

    pub async fn remove_from_watchlist(&self, user_id: &str, title_id: i32) -> Result<bool> {
        self.watchlist_repo().remove(user_id, title_id).await
    }

    pub async fn watchlist_contains(&self, user_id: &str, title_id: i32) -> Result<bool> {
        self.watchlist_repo().contains(user_id, title_id).await
    }

    pub async fn get_watchlist(
        &self,
        user_id: &str,
        kind: Option<TitleKind>,
    ) -> Result<Vec<WatchlistItem>> {
        self.watchlist_repo().list(user_id, kind).await
    }

    pub async fn watchlist_tmdb_ids(&self, user_id: &str, kind: TitleKind) -> Result<Vec<i32>> {
        self.watchlist_repo().tmdb_ids(user_id, kind).await
    }

    // ========== Watch history ==========

    pub async fn record_watch(
        &self,
        user_id: &str,
        title_id: i32,
        kind: TitleKind,
        rating: i32,
        notes: Option<&str>,
    ) -> Result<()> {
        self.history_repo()
            .upsert(user_id, title_id, kind, rating, notes)
            .await
    }

    pub async fn update_watch(
        &self,
        user_id: &str,
        title_id: i32,
        rating: i32,
        notes: Option<&str>,
    ) -> Result<bool> {
        self.history_repo()
            .update_entry(user_id, title_id, rating, notes)
            .await
    }

    pub async fn remove_watch(&self, user_id: &str, title_id: i32) -> Result<bool> {
        self.history_repo().remove(user_id, title_id).await
    }

    pub async fn get_history(
        &self,
        user_id: &str,
        kind: Option<TitleKind>,
        limit: Option<u64>,
    ) -> Result<Vec<HistoryItem>> {
        self.history_repo().list(user_id, kind, limit).await
    }

    pub async fn history_rated_at_least(
        &self,
        user_id: &str,
        kind: TitleKind,
        min_rating: i32,
        limit: Option<u64>,
    ) -> Result<Vec<HistoryItem>> {
        self.history_repo()
            .rated_at_least(user_id, kind, min_rating, limit)
            .await
    }

    pub async fn history_tmdb_ids(&self, user_id: &str, kind: TitleKind) -> Result<Vec<i32>> {
        self.history_repo().tmdb_ids(user_id, kind).await
    }

    // ========== Dismissed recommendations ==========

    pub async fn dismiss(
        &self,
        user_id: &str,
        title_id: i32,
        tmdb_id: i32,
        kind: TitleKind,
    ) -> Result<dismissed_recommendations::Model, StoreError> {
        self.dismissed_repo()
            .add(user_id, title_id, tmdb_id, kind)
            .await
    }

    pub async fn undismiss(&self, user_id: &str, tmdb_id: i32) -> Result<bool> {
        self.dismissed_repo().remove(user_id, tmdb_id).await
    }

    pub async fn get_dismissed(
        &self,
        user_id: &str,
        kind: Option<TitleKind>,
        limit: Option<u64>,
    ) -> Result<Vec<DismissedItem>> {
        self.dismissed_repo().list(user_id, kind, limit).await
    }

    pub async fn dismissed_tmdb_ids(&self, user_id: &str, kind: TitleKind) -> Result<Vec<i32>> {
        self.dismissed_repo().tmdb_ids(user_id, kind).await
    }
}
