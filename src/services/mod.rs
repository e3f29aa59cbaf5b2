pub mod preferences;
pub use preferences::PreferenceEstimator;

pub mod aggregator;
pub use aggregator::CandidateAggregator;

pub mod enrichment;
pub use enrichment::EnrichmentStage;

pub mod scoring;

pub mod ranking;
pub use ranking::{LlmRanker, RankedEntry, RankingError};

pub mod recommendation_service;
pub use recommendation_service::{RecommendationError, RecommendationService};

pub mod recommendation_service_impl;
pub use recommendation_service_impl::DefaultRecommendationService;

pub mod watch_service;
pub use watch_service::{WatchError, WatchService};

pub mod watch_service_impl;
pub use watch_service_impl::SeaOrmWatchService;
