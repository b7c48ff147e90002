//! Seams between the aggregation pipeline and the external providers.
//!
//! [`crate::YelpClient`] implements both traits against the real API; tests
//! substitute in-memory fakes.

use std::future::Future;
use std::time::Duration;

use tripscout_core::SearchQuery;

use crate::error::ProviderError;
use crate::types::{ProviderReview, SearchPage};

/// Paginated business search around a coordinate.
pub trait BusinessSearchProvider: Send + Sync {
    /// Fetches up to `limit` businesses starting at `offset` for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on network failure, non-2xx status, or a
    /// body that does not match [`SearchPage`].
    fn search(
        &self,
        query: &SearchQuery,
        limit: u32,
        offset: u32,
    ) -> impl Future<Output = Result<SearchPage, ProviderError>> + Send;
}

/// Per-business review lookup.
pub trait BusinessDetailProvider: Send + Sync {
    /// Lists the provider's reviews for `business_id`, in provider order.
    ///
    /// Implementations make one attempt and do not retry; callers retry
    /// through [`crate::RateLimiter`] so every attempt is spaced.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on network failure, non-2xx status, or a
    /// malformed body.
    fn list_reviews(
        &self,
        business_id: &str,
    ) -> impl Future<Output = Result<Vec<ProviderReview>, ProviderError>> + Send;
}

/// Runs a provider call under `limit`, turning an elapsed deadline into
/// [`ProviderError::Timeout`].
pub(crate) async fn with_timeout<T, Fut>(
    limit: Duration,
    operation: &str,
    call: Fut,
) -> Result<T, ProviderError>
where
    Fut: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ProviderError::Timeout {
            operation: operation.to_owned(),
            after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
