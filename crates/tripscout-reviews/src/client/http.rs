//! Shared request plumbing for the provider clients.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tripscout_core::AppConfig;

use crate::error::ProviderError;

/// Transport settings common to every provider client.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Additional attempts after the first failure on 429 / network errors / 5xx.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl HttpOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
        }
    }
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "tripscout/0.1 (trip-planner)".to_owned(),
            max_retries: 2,
            backoff_base_ms: 500,
        }
    }
}

pub(super) fn build_client(options: &HttpOptions) -> Result<Client, ProviderError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(options.timeout_secs))
        .connect_timeout(Duration::from_secs(options.timeout_secs.min(10)))
        .user_agent(options.user_agent.as_str())
        .build()?;
    Ok(client)
}

/// Parses a provider base URL, normalising it to end in exactly one slash so
/// that relative joins append to the path instead of replacing its last
/// segment.
pub(super) fn parse_base_url(base_url: &str) -> Result<Url, ProviderError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    let url = Url::parse(&normalised).map_err(|e| ProviderError::InvalidBaseUrl {
        base_url: base_url.to_owned(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ProviderError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: "URL cannot be used as a base".to_owned(),
        });
    }
    Ok(url)
}

/// Maps the response status onto [`ProviderError`] and decodes a 2xx body.
///
/// `url` is the request URL with any secret query parameters already
/// stripped; it only appears in error messages.
pub(super) async fn read_json<T: DeserializeOwned>(
    response: Response,
    provider: &'static str,
    url: &str,
    context: &str,
) -> Result<T, ProviderError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(ProviderError::RateLimited {
            provider,
            retry_after_secs,
        });
    }

    if status == StatusCode::NOT_FOUND {
        return Err(ProviderError::NotFound {
            url: url.to_owned(),
        });
    }

    if !status.is_success() {
        return Err(ProviderError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
        });
    }

    // The request URL may carry an API key in its query string.
    let body = response
        .text()
        .await
        .map_err(reqwest::Error::without_url)?;
    serde_json::from_str::<T>(&body).map_err(|e| ProviderError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

/// Renders `url` without its query string, for logs and error messages.
pub(super) fn redact_query(url: &Url) -> String {
    let mut redacted = url.clone();
    redacted.set_query(None);
    redacted.to_string()
}
