pub mod catalog;
pub mod recommendation;
pub mod review;
pub mod title;
pub mod watch;
