pub use super::dismissed_recommendations::Entity as DismissedRecommendations;
pub use super::titles::Entity as Titles;
pub use super::users::Entity as Users;
pub use super::watch_history::Entity as WatchHistory;
pub use super::watchlist::Entity as Watchlist;
