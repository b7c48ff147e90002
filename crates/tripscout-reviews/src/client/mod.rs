//! HTTP clients for the business-review (Yelp Fusion) and geocoding
//! (LocationIQ) providers.

mod geocode;
mod http;

use std::future::Future;

use reqwest::{Client, Url};
use tripscout_core::SearchQuery;

use crate::error::ProviderError;
use crate::provider::{BusinessDetailProvider, BusinessSearchProvider};
use crate::rate_limit::retry_with_backoff;
use crate::types::{ProviderReview, ReviewsResponse, SearchPage};

pub use geocode::GeocodeClient;
pub use http::HttpOptions;

const DEFAULT_YELP_BASE_URL: &str = "https://api.yelp.com/v3";

/// Client for the Yelp Fusion business search and reviews endpoints.
///
/// Authenticates with a bearer token. Handles rate limiting (429), not-found
/// (404), and other non-2xx responses as typed errors. The inherent methods
/// retry transient failures with backoff up to `max_retries` additional
/// attempts. The [`BusinessDetailProvider`] impl makes a single attempt so
/// the caller can route each retry through its own rate limiter.
pub struct YelpClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl YelpClient {
    /// Creates a client pointed at the production Yelp API.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, options: &HttpOptions) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, DEFAULT_YELP_BASE_URL, options)
    }

    /// Creates a client with a custom base URL (configured override, or a
    /// wiremock server in tests).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`ProviderError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        base_url: &str,
        options: &HttpOptions,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http::build_client(options)?,
            api_key: api_key.to_owned(),
            base_url: http::parse_base_url(base_url)?,
            max_retries: options.max_retries,
            backoff_base_ms: options.backoff_base_ms,
        })
    }

    /// Fetches one page of `GET /businesses/search` around the query point.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::RateLimited`]: HTTP 429 after all retries.
    /// - [`ProviderError::NotFound`]: HTTP 404 (not retried).
    /// - [`ProviderError::UnexpectedStatus`]: other non-2xx (5xx retried).
    /// - [`ProviderError::Http`]: network failure after all retries.
    /// - [`ProviderError::Deserialize`]: body does not match [`SearchPage`].
    pub async fn search_businesses(
        &self,
        query: &SearchQuery,
        limit: u32,
        offset: u32,
    ) -> Result<SearchPage, ProviderError> {
        let url = self.search_url(query, limit, offset)?;
        let context = format!("business search page at offset {offset}");
        self.get_json(url, &context, self.max_retries).await
    }

    /// Fetches `GET /businesses/{id}/reviews` and returns the reviews in
    /// provider order.
    ///
    /// # Errors
    ///
    /// Same as [`Self::search_businesses`].
    pub async fn business_reviews(
        &self,
        business_id: &str,
    ) -> Result<Vec<ProviderReview>, ProviderError> {
        self.reviews_with_retries(business_id, self.max_retries).await
    }

    async fn reviews_with_retries(
        &self,
        business_id: &str,
        max_retries: u32,
    ) -> Result<Vec<ProviderReview>, ProviderError> {
        let url = self.reviews_url(business_id)?;
        let context = format!("reviews for business {business_id}");
        let response: ReviewsResponse = self.get_json(url, &context, max_retries).await?;
        Ok(response.reviews)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        context: &str,
        max_retries: u32,
    ) -> Result<T, ProviderError> {
        let display_url = url.to_string();
        retry_with_backoff(max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            let display_url = display_url.as_str();
            async move {
                let response = self
                    .client
                    .get(url)
                    .bearer_auth(&self.api_key)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .send()
                    .await?;
                http::read_json(response, "yelp", display_url, context).await
            }
        })
        .await
    }

    fn search_url(&self, query: &SearchQuery, limit: u32, offset: u32) -> Result<Url, ProviderError> {
        let mut url = self.endpoint(&["businesses", "search"])?;
        url.query_pairs_mut()
            .append_pair("latitude", &query.latitude.to_string())
            .append_pair("longitude", &query.longitude.to_string())
            .append_pair("term", &query.keyword)
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        Ok(url)
    }

    fn reviews_url(&self, business_id: &str) -> Result<Url, ProviderError> {
        self.endpoint(&["businesses", business_id, "reviews"])
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: "URL cannot be used as a base".to_owned(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl BusinessSearchProvider for YelpClient {
    fn search(
        &self,
        query: &SearchQuery,
        limit: u32,
        offset: u32,
    ) -> impl Future<Output = Result<SearchPage, ProviderError>> + Send {
        self.search_businesses(query, limit, offset)
    }
}

impl BusinessDetailProvider for YelpClient {
    fn list_reviews(
        &self,
        business_id: &str,
    ) -> impl Future<Output = Result<Vec<ProviderReview>, ProviderError>> + Send {
        self.reviews_with_retries(business_id, 0)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
