use thiserror::Error;

/// Failure talking to one of the external providers (business search,
/// business reviews, geocoding).
///
/// Inside the aggregation pipeline these are recovered per page or per item;
/// they only reach a caller directly through the client methods.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {provider} (retry after {retry_after_secs}s)")]
    RateLimited {
        provider: &'static str,
        retry_after_secs: u64,
    },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

/// Failure of a whole aggregation call.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("all {attempted} search pages failed; last error: {last_error}")]
    AllPagesFailed { attempted: usize, last_error: String },

    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build provider client: {0}")]
    ClientBuild(#[from] ProviderError),
}
