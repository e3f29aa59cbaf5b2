use std::collections::HashSet;

use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};
use tracing::info;

use crate::db::StoreError;
use crate::domain::TitleKind;
use crate::entities::{prelude::*, titles, watch_history, watchlist};
use crate::models::watch::WatchlistItem;

pub struct WatchlistRepository {
    conn: DatabaseConnection,
}

impl WatchlistRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_row(entry: watchlist::Model, title: titles::Model) -> WatchlistItem {
        WatchlistItem {
            tmdb_id: title.tmdb_id,
            title: title.title,
            kind: entry.kind.parse().unwrap_or(TitleKind::Film),
            release_year: title.release_year,
            poster_url: title.poster_url,
            added_at: entry.added_at,
        }
    }

    /// Adds a title to the watchlist. A second add of the same (user, title)
    /// pair trips the unique index and surfaces as [`StoreError::Duplicate`].
    pub async fn add(
        &self,
        user_id: &str,
        title_id: i32,
        kind: TitleKind,
    ) -> Result<watchlist::Model, StoreError> {
        let entry = watchlist::ActiveModel {
            user_id: Set(user_id.to_owned()),
            title_id: Set(title_id),
            kind: Set(kind.as_str().to_owned()),
            added_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let inserted = entry.insert(&self.conn).await?;
        info!("Watchlist add: user={} title_id={}", user_id, title_id);
        Ok(inserted)
    }

    pub async fn remove(&self, user_id: &str, title_id: i32) -> Result<bool> {
        let result = Watchlist::delete_many()
            .filter(watchlist::Column::UserId.eq(user_id))
            .filter(watchlist::Column::TitleId.eq(title_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn contains(&self, user_id: &str, title_id: i32) -> Result<bool> {
        let entry = Watchlist::find()
            .filter(watchlist::Column::UserId.eq(user_id))
            .filter(watchlist::Column::TitleId.eq(title_id))
            .one(&self.conn)
            .await?;

        Ok(entry.is_some())
    }

    pub async fn list(
        &self,
        user_id: &str,
        kind: Option<TitleKind>,
    ) -> Result<Vec<WatchlistItem>> {
        let mut query = Watchlist::find().filter(watchlist::Column::UserId.eq(user_id));

        if let Some(kind) = kind {
            query = query.filter(watchlist::Column::Kind.eq(kind.as_str()));
        }

        let rows = query
            .order_by_desc(watchlist::Column::AddedAt)
            .find_also_related(titles::Entity)
            .all(&self.conn)
            .await?;

        // Marking a title watched deletes its watchlist row, but rows written
        // before that rule can linger; the listing hides anything watched.
        let watched: HashSet<i32> = WatchHistory::find()
            .filter(watch_history::Column::UserId.eq(user_id))
            .select_only()
            .column(watch_history::Column::TitleId)
            .into_tuple::<i32>()
            .all(&self.conn)
            .await?
            .into_iter()
            .collect();

        Ok(rows
            .into_iter()
            .filter(|(entry, _)| !watched.contains(&entry.title_id))
            .filter_map(|(entry, title)| title.map(|t| Self::map_row(entry, t)))
            .collect())
    }

    /// External catalog ids of every watchlisted title, for excluded-set
    /// assembly.
    pub async fn tmdb_ids(&self, user_id: &str, kind: TitleKind) -> Result<Vec<i32>> {
        let ids: Vec<i32> = Watchlist::find()
            .filter(watchlist::Column::UserId.eq(user_id))
            .filter(watchlist::Column::Kind.eq(kind.as_str()))
            .join(JoinType::InnerJoin, watchlist::Relation::Titles.def())
            .select_only()
            .column(titles::Column::TmdbId)
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(ids)
    }
}
