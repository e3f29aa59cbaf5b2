use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::debug;

use crate::entities::{prelude::*, titles};
use crate::models::title::TitleUpsert;

pub struct TitleRepository {
    conn: DatabaseConnection,
}

impl TitleRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts or refreshes catalog metadata, keyed by the external id.
    /// Review columns are left untouched so an upsert never erases a stored
    /// rating. Returns the stored row.
    pub async fn upsert(&self, title: &TitleUpsert) -> Result<titles::Model> {
        let active_model = titles::ActiveModel {
            tmdb_id: Set(title.tmdb_id),
            title: Set(title.title.clone()),
            kind: Set(title.kind.as_str().to_owned()),
            release_year: Set(title.release_year),
            genres: Set(serde_json::to_string(&title.genres).ok()),
            poster_url: Set(title.poster_url.clone()),
            overview: Set(title.overview.clone()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        Titles::insert(active_model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(titles::Column::TmdbId)
                    .update_columns([
                        titles::Column::Title,
                        titles::Column::Kind,
                        titles::Column::ReleaseYear,
                        titles::Column::Genres,
                        titles::Column::PosterUrl,
                        titles::Column::Overview,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        let stored = Titles::find()
            .filter(titles::Column::TmdbId.eq(title.tmdb_id))
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Title {} missing after upsert", title.tmdb_id))?;

        debug!("Upserted title {} ({})", stored.title, stored.tmdb_id);
        Ok(stored)
    }

    pub async fn get_by_tmdb_id(&self, tmdb_id: i32) -> Result<Option<titles::Model>> {
        let title = Titles::find()
            .filter(titles::Column::TmdbId.eq(tmdb_id))
            .one(&self.conn)
            .await?;
        Ok(title)
    }

    /// Attaches review data to a title. `rating`/`url`/`excerpt` may all be
    /// absent when a lookup ran but found nothing worth keeping; the
    /// checked-at timestamp is recorded either way.
    pub async fn set_review(
        &self,
        tmdb_id: i32,
        rating: Option<i32>,
        url: Option<&str>,
        excerpt: Option<&str>,
    ) -> Result<()> {
        Titles::update_many()
            .col_expr(
                titles::Column::ReviewRating,
                sea_orm::sea_query::Expr::value(rating),
            )
            .col_expr(
                titles::Column::ReviewUrl,
                sea_orm::sea_query::Expr::value(url),
            )
            .col_expr(
                titles::Column::ReviewExcerpt,
                sea_orm::sea_query::Expr::value(excerpt),
            )
            .col_expr(
                titles::Column::ReviewCheckedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(titles::Column::TmdbId.eq(tmdb_id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Records that a review lookup ran without touching any stored review
    /// data.
    pub async fn mark_review_checked(&self, tmdb_id: i32) -> Result<()> {
        Titles::update_many()
            .col_expr(
                titles::Column::ReviewCheckedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(titles::Column::TmdbId.eq(tmdb_id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Stored rows carrying a review rating, for enrichment reuse. Ids with
    /// no row or no rating are simply absent from the result.
    pub async fn reviewed_titles(&self, tmdb_ids: &[i32]) -> Result<Vec<titles::Model>> {
        if tmdb_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = Titles::find()
            .filter(titles::Column::TmdbId.is_in(tmdb_ids.to_vec()))
            .filter(titles::Column::ReviewRating.is_not_null())
            .all(&self.conn)
            .await?;

        Ok(rows)
    }
}
