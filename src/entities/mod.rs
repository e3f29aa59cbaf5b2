pub mod prelude;

pub mod dismissed_recommendations;
pub mod titles;
pub mod users;
pub mod watch_history;
pub mod watchlist;
