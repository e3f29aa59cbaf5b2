use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tracing::info;

use crate::db::StoreError;
use crate::domain::TitleKind;
use crate::entities::{dismissed_recommendations, prelude::*, titles};
use crate::models::watch::DismissedItem;

pub struct DismissedRepository {
    conn: DatabaseConnection,
}

impl DismissedRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_row(entry: dismissed_recommendations::Model, title: titles::Model) -> DismissedItem {
        DismissedItem {
            tmdb_id: entry.tmdb_id,
            title: title.title,
            kind: entry.kind.parse().unwrap_or(TitleKind::Film),
            release_year: title.release_year,
            dismissed_at: entry.dismissed_at,
        }
    }

    /// Records a dismissal. Dismissing the same title twice trips the unique
    /// index and surfaces as [`StoreError::Duplicate`].
    pub async fn add(
        &self,
        user_id: &str,
        title_id: i32,
        tmdb_id: i32,
        kind: TitleKind,
    ) -> Result<dismissed_recommendations::Model, StoreError> {
        let entry = dismissed_recommendations::ActiveModel {
            user_id: Set(user_id.to_owned()),
            title_id: Set(title_id),
            tmdb_id: Set(tmdb_id),
            kind: Set(kind.as_str().to_owned()),
            dismissed_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let inserted = entry.insert(&self.conn).await?;
        info!("Dismissed: user={} tmdb_id={}", user_id, tmdb_id);
        Ok(inserted)
    }

    pub async fn remove(&self, user_id: &str, tmdb_id: i32) -> Result<bool> {
        let result = DismissedRecommendations::delete_many()
            .filter(dismissed_recommendations::Column::UserId.eq(user_id))
            .filter(dismissed_recommendations::Column::TmdbId.eq(tmdb_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn list(
        &self,
        user_id: &str,
        kind: Option<TitleKind>,
        limit: Option<u64>,
    ) -> Result<Vec<DismissedItem>> {
        let mut query = DismissedRecommendations::find()
            .filter(dismissed_recommendations::Column::UserId.eq(user_id));

        if let Some(kind) = kind {
            query = query.filter(dismissed_recommendations::Column::Kind.eq(kind.as_str()));
        }

        query = query.order_by_desc(dismissed_recommendations::Column::DismissedAt);

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        let rows = query.find_also_related(titles::Entity).all(&self.conn).await?;

        Ok(rows
            .into_iter()
            .filter_map(|(entry, title)| title.map(|t| Self::map_row(entry, t)))
            .collect())
    }

    /// External catalog ids of every dismissed title. Denormalized on the
    /// entry itself, so no join.
    pub async fn tmdb_ids(&self, user_id: &str, kind: TitleKind) -> Result<Vec<i32>> {
        let ids: Vec<i32> = DismissedRecommendations::find()
            .filter(dismissed_recommendations::Column::UserId.eq(user_id))
            .filter(dismissed_recommendations::Column::Kind.eq(kind.as_str()))
            .select_only()
            .column(dismissed_recommendations::Column::TmdbId)
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(ids)
    }
}
