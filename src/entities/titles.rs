use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "titles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub tmdb_id: i32,
    pub title: String,
    pub kind: String,
    pub release_year: Option<i32>,
    /// JSON array of catalog genre ids. Example: [878, 53]
    pub genres: Option<String>,
    pub poster_url: Option<String>,
    pub overview: Option<String>,
    pub review_rating: Option<i32>,
    pub review_url: Option<String>,
    pub review_excerpt: Option<String>,
    pub review_checked_at: Option<String>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::watchlist::Entity")]
    Watchlist,
    #[sea_orm(has_many = "super::watch_history::Entity")]
    WatchHistory,
    #[sea_orm(has_many = "super::dismissed_recommendations::Entity")]
    DismissedRecommendations,
}

impl Related<super::watchlist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Watchlist.def()
    }
}

impl Related<super::watch_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WatchHistory.def()
    }
}

impl Related<super::dismissed_recommendations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DismissedRecommendations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
