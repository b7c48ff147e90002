//! Request tagging, bearer auth, and the inbound request budget.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tripscout_core::{AppConfig, Environment};
use uuid::Uuid;

use crate::api::ApiError;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID for the current request, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer tokens the protected routes accept. An empty set disables auth.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    keys: Arc<[String]>,
}

impl BearerAuth {
    /// Accepts the configured `api_keys`.
    ///
    /// # Errors
    ///
    /// Fails when no keys are configured outside development.
    pub fn from_app_config(config: &AppConfig) -> anyhow::Result<Self> {
        if config.api_keys.is_empty() {
            anyhow::ensure!(
                config.env == Environment::Development,
                "TRIPSCOUT_API_KEYS is required in the {} environment",
                config.env
            );
            tracing::warn!("no API keys configured; bearer auth disabled in development");
        }
        Ok(Self::with_keys(config.api_keys.clone()))
    }

    #[must_use]
    pub fn with_keys(keys: Vec<String>) -> Self {
        Self { keys: keys.into() }
    }

    /// Lets every request through.
    #[must_use]
    pub fn disabled() -> Self {
        Self::with_keys(Vec::new())
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Compares `token` against every key in constant time.
    fn accepts(&self, token: &str) -> bool {
        self.keys.iter().fold(false, |found, key| {
            found | bool::from(key.as_bytes().ct_eq(token.as_bytes()))
        })
    }
}

/// Shared per-window request budget for the protected routes.
#[derive(Debug, Clone)]
pub struct InboundRateLimit {
    per_window: usize,
    window: Duration,
    current: Arc<Mutex<(Instant, usize)>>,
}

impl InboundRateLimit {
    #[must_use]
    pub fn new(per_window: usize, window: Duration) -> Self {
        Self {
            per_window,
            window,
            current: Arc::new(Mutex::new((Instant::now(), 0))),
        }
    }

    #[must_use]
    pub fn per_minute(per_window: usize) -> Self {
        Self::new(per_window, Duration::from_secs(60))
    }

    /// Takes one request from the budget.
    ///
    /// # Errors
    ///
    /// Returns the time left until the window resets when the budget is spent.
    pub async fn try_acquire(&self) -> Result<(), Duration> {
        let mut current = self.current.lock().await;
        let (opened, used) = &mut *current;
        let now = Instant::now();
        if now.duration_since(*opened) >= self.window {
            *opened = now;
            *used = 0;
        }
        if *used < self.per_window {
            *used += 1;
            Ok(())
        } else {
            Err(self.window - now.duration_since(*opened))
        }
    }
}

/// Tags the request with the caller's `x-request-id`, or a fresh `UUIDv4`,
/// and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), ToOwned::to_owned);
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

pub async fn require_bearer_auth(
    State(auth): State<BearerAuth>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.is_enabled() {
        return next.run(req).await;
    }
    match bearer_token(req.headers().get(header::AUTHORIZATION)) {
        Some(token) if auth.accepts(token) => next.run(req).await,
        _ => ApiError::new(StatusCode::UNAUTHORIZED, "missing or invalid bearer token")
            .into_response(),
    }
}

/// Rejects with 429 and `Retry-After` once the window's budget is spent.
pub async fn enforce_rate_limit(
    State(limit): State<InboundRateLimit>,
    req: Request,
    next: Next,
) -> Response {
    match limit.try_acquire().await {
        Ok(()) => next.run(req).await,
        Err(reset_in) => {
            let retry_after = reset_in.as_secs().max(1);
            tracing::warn!(retry_after, "inbound rate limit exceeded");
            let mut res =
                ApiError::new(StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded").into_response();
            res.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            res
        }
    }
}

fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(env: Environment, keys: &[&str]) -> AppConfig {
        let mut config = test_config();
        config.env = env;
        config.api_keys = keys.iter().map(|k| (*k).to_owned()).collect();
        config
    }

    fn test_config() -> AppConfig {
        AppConfig {
            env: Environment::Development,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "info".to_owned(),
            yelp_api_key: "y".to_owned(),
            geocode_api_key: "g".to_owned(),
            yelp_base_url: "http://localhost".to_owned(),
            geocode_base_url: "http://localhost".to_owned(),
            request_timeout_secs: 1,
            user_agent: "test".to_owned(),
            search_pages: 1,
            search_page_size: 10,
            result_limit: 3,
            rank_direction: tripscout_core::RankDirection::Ascending,
            dedup_by_id: false,
            detail_min_interval_ms: 1,
            max_retries: 0,
            retry_backoff_base_ms: 1,
            api_rate_limit_per_minute: 10,
            api_keys: Vec::new(),
        }
    }

    #[test]
    fn bearer_token_is_extracted_and_trimmed() {
        let header = HeaderValue::from_static("Bearer  test-token ");
        assert_eq!(bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn non_bearer_or_blank_header_has_no_token() {
        assert_eq!(bearer_token(Some(&HeaderValue::from_static("Basic abc123"))), None);
        assert_eq!(bearer_token(Some(&HeaderValue::from_static("Bearer   "))), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn no_keys_disable_auth_in_development() {
        let auth = BearerAuth::from_app_config(&config(Environment::Development, &[]))
            .expect("development allows missing keys");
        assert!(!auth.is_enabled());
    }

    #[test]
    fn no_keys_fail_outside_development() {
        for env in [Environment::Test, Environment::Production] {
            let err = BearerAuth::from_app_config(&config(env, &[])).unwrap_err();
            assert!(err.to_string().contains("TRIPSCOUT_API_KEYS"));
        }
    }

    #[test]
    fn any_configured_key_is_accepted() {
        let auth =
            BearerAuth::from_app_config(&config(Environment::Production, &["alpha", "beta"]))
                .unwrap();
        assert!(auth.is_enabled());
        assert!(auth.accepts("alpha"));
        assert!(auth.accepts("beta"));
        assert!(!auth.accepts("gamma"));
        assert!(!auth.accepts("alph"));
    }

    #[tokio::test(start_paused = true)]
    async fn budget_is_spent_then_refilled_when_the_window_resets() {
        let limit = InboundRateLimit::new(2, Duration::from_secs(60));

        assert_eq!(limit.try_acquire().await, Ok(()));
        assert_eq!(limit.try_acquire().await, Ok(()));

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(limit.try_acquire().await, Err(Duration::from_secs(40)));

        tokio::time::advance(Duration::from_secs(40)).await;
        assert_eq!(limit.try_acquire().await, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_one_budget() {
        let limit = InboundRateLimit::per_minute(1);
        let other = limit.clone();

        assert!(limit.try_acquire().await.is_ok());
        assert!(other.try_acquire().await.is_err());
    }
}
