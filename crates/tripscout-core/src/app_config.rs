use std::net::SocketAddr;

use crate::reviews::RankDirection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub yelp_api_key: String,
    pub geocode_api_key: String,
    pub yelp_base_url: String,
    pub geocode_base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Number of search pages fetched per aggregation.
    pub search_pages: u32,
    /// Records requested per search page (the provider caps this at 50).
    pub search_page_size: u32,
    /// How many ranked candidates survive into enrichment.
    pub result_limit: usize,
    pub rank_direction: RankDirection,
    pub dedup_by_id: bool,
    /// Minimum spacing between review-detail calls.
    pub detail_min_interval_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub api_rate_limit_per_minute: usize,
    /// Bearer tokens accepted by the HTTP server. Empty disables auth in
    /// development and is rejected by the server elsewhere.
    pub api_keys: Vec<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("yelp_api_key", &"[redacted]")
            .field("geocode_api_key", &"[redacted]")
            .field("yelp_base_url", &self.yelp_base_url)
            .field("geocode_base_url", &self.geocode_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("search_pages", &self.search_pages)
            .field("search_page_size", &self.search_page_size)
            .field("result_limit", &self.result_limit)
            .field("rank_direction", &self.rank_direction)
            .field("dedup_by_id", &self.dedup_by_id)
            .field("detail_min_interval_ms", &self.detail_min_interval_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("api_rate_limit_per_minute", &self.api_rate_limit_per_minute)
            .field("api_keys", &format_args!("[{} redacted]", self.api_keys.len()))
            .finish()
    }
}
