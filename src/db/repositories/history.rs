use anyhow::Result;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set, TransactionTrait,
};
use tracing::info;

use crate::domain::TitleKind;
use crate::entities::{prelude::*, titles, watch_history, watchlist};
use crate::models::watch::HistoryItem;

pub struct HistoryRepository {
    conn: DatabaseConnection,
}

impl HistoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_row(entry: watch_history::Model, title: titles::Model) -> HistoryItem {
        HistoryItem {
            tmdb_id: title.tmdb_id,
            title: title.title,
            kind: entry.kind.parse().unwrap_or(TitleKind::Film),
            release_year: title.release_year,
            genres: title
                .genres
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            poster_url: title.poster_url,
            rating: entry.rating,
            notes: entry.notes,
            watched_at: entry.watched_at,
        }
    }

    /// Records a watch. Watching a title again overwrites rating and notes,
    /// and any watchlist entry for the pair goes away in the same
    /// transaction.
    pub async fn upsert(
        &self,
        user_id: &str,
        title_id: i32,
        kind: TitleKind,
        rating: i32,
        notes: Option<&str>,
    ) -> Result<()> {
        let txn = self.conn.begin().await?;

        Watchlist::delete_many()
            .filter(watchlist::Column::UserId.eq(user_id))
            .filter(watchlist::Column::TitleId.eq(title_id))
            .exec(&txn)
            .await?;

        let entry = watch_history::ActiveModel {
            user_id: Set(user_id.to_owned()),
            title_id: Set(title_id),
            kind: Set(kind.as_str().to_owned()),
            rating: Set(rating),
            notes: Set(notes.map(str::to_owned)),
            watched_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        WatchHistory::insert(entry)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    watch_history::Column::UserId,
                    watch_history::Column::TitleId,
                ])
                .update_columns([
                    watch_history::Column::Rating,
                    watch_history::Column::Notes,
                    watch_history::Column::WatchedAt,
                ])
                .to_owned(),
            )
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(
            "Watch recorded: user={} title_id={} rating={}",
            user_id, title_id, rating
        );
        Ok(())
    }

    pub async fn update_entry(
        &self,
        user_id: &str,
        title_id: i32,
        rating: i32,
        notes: Option<&str>,
    ) -> Result<bool> {
        let result = WatchHistory::update_many()
            .col_expr(
                watch_history::Column::Rating,
                sea_orm::sea_query::Expr::value(rating),
            )
            .col_expr(
                watch_history::Column::Notes,
                sea_orm::sea_query::Expr::value(notes),
            )
            .filter(watch_history::Column::UserId.eq(user_id))
            .filter(watch_history::Column::TitleId.eq(title_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn remove(&self, user_id: &str, title_id: i32) -> Result<bool> {
        let result = WatchHistory::delete_many()
            .filter(watch_history::Column::UserId.eq(user_id))
            .filter(watch_history::Column::TitleId.eq(title_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn list(
        &self,
        user_id: &str,
        kind: Option<TitleKind>,
        limit: Option<u64>,
    ) -> Result<Vec<HistoryItem>> {
        let mut query = WatchHistory::find().filter(watch_history::Column::UserId.eq(user_id));

        if let Some(kind) = kind {
            query = query.filter(watch_history::Column::Kind.eq(kind.as_str()));
        }

        query = query.order_by_desc(watch_history::Column::WatchedAt);

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        let rows = query.find_also_related(titles::Entity).all(&self.conn).await?;

        Ok(rows
            .into_iter()
            .filter_map(|(entry, title)| title.map(|t| Self::map_row(entry, t)))
            .collect())
    }

    /// Entries rated at or above `min_rating`, most recent first. Feeds both
    /// genre-preference derivation and similarity seeding.
    pub async fn rated_at_least(
        &self,
        user_id: &str,
        kind: TitleKind,
        min_rating: i32,
        limit: Option<u64>,
    ) -> Result<Vec<HistoryItem>> {
        let mut query = WatchHistory::find()
            .filter(watch_history::Column::UserId.eq(user_id))
            .filter(watch_history::Column::Kind.eq(kind.as_str()))
            .filter(watch_history::Column::Rating.gte(min_rating))
            .order_by_desc(watch_history::Column::WatchedAt);

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        let rows = query.find_also_related(titles::Entity).all(&self.conn).await?;

        Ok(rows
            .into_iter()
            .filter_map(|(entry, title)| title.map(|t| Self::map_row(entry, t)))
            .collect())
    }

    /// External catalog ids of every watched title, for excluded-set
    /// assembly.
    pub async fn tmdb_ids(&self, user_id: &str, kind: TitleKind) -> Result<Vec<i32>> {
        let ids: Vec<i32> = WatchHistory::find()
            .filter(watch_history::Column::UserId.eq(user_id))
            .filter(watch_history::Column::Kind.eq(kind.as_str()))
            .join(JoinType::InnerJoin, watch_history::Relation::Titles.def())
            .select_only()
            .column(titles::Column::TmdbId)
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(ids)
    }
}
