pub mod dismissed;
pub mod history;
pub mod title;
pub mod user;
pub mod watchlist;
