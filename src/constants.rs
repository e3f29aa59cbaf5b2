pub mod http {
    use std::time::Duration;

    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
}

pub mod review {

    pub const PAGE_SIZE: u32 = 20;

    /// Days before a title with no rating found is worth checking again.
    pub const RECHECK_AFTER_DAYS: i64 = 30;
}

pub mod enrichment {

    pub const CONCURRENT_LOOKUPS: usize = 4;
}

pub mod limits {

    pub const MAX_SEARCH_RESULTS: usize = 10;

    pub const DEFAULT_HISTORY_LIMIT: u64 = 10;
}
