use reqwest::{Client, Url};

use crate::error::ProviderError;
use crate::rate_limit::retry_with_backoff;
use crate::types::{GeoPoint, GeocodePlace};

use super::http::{self, HttpOptions};

const DEFAULT_GEOCODE_BASE_URL: &str = "https://us1.locationiq.com/v1";

/// Client for LocationIQ's free-text forward geocoding endpoint.
///
/// The API key travels as a `key` query parameter, so request URLs are
/// redacted before they reach logs or error messages.
pub struct GeocodeClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl GeocodeClient {
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, options: &HttpOptions) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, DEFAULT_GEOCODE_BASE_URL, options)
    }

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

    /// Searches for places matching `query`, best match first.
    ///
    /// The provider answers "no match" with a 404; that is reported as an
    /// empty list rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on network failure, 429 after retries, any
    /// other non-2xx status, or a malformed body.
    pub async fn search(&self, query: &str) -> Result<Vec<GeocodePlace>, ProviderError> {
        let url = self.search_url(query)?;
        let display_url = http::redact_query(&url);
        let context = format!("geocode search for \"{query}\"");

        let outcome = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            let display_url = display_url.as_str();
            let context = context.as_str();
            async move {
                let response = self
                    .client
                    .get(url)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .send()
                    .await
                    .map_err(reqwest::Error::without_url)?;
                http::read_json::<Vec<GeocodePlace>>(response, "locationiq", display_url, context)
                    .await
            }
        })
        .await;

        match outcome {
            Err(ProviderError::NotFound { .. }) => {
                tracing::debug!(query, "geocoder found no match");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Resolves `query` to the coordinates of its best match, or `None` when
    /// nothing usable matched.
    ///
    /// # Errors
    ///
    /// Same as [`Self::search`].
    pub async fn locate(&self, query: &str) -> Result<Option<GeoPoint>, ProviderError> {
        let places = self.search(query).await?;
        Ok(places.iter().find_map(GeocodePlace::to_point))
    }

    fn search_url(&self, query: &str) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: "URL cannot be used as a base".to_owned(),
            })?
            .pop_if_empty()
            .push("search.php");
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("q", query)
            .append_pair("format", "json");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_puts_key_and_query_in_params() {
        let client = GeocodeClient::with_base_url(
            "geo-key",
            "https://us1.locationiq.com/v1",
            &HttpOptions::default(),
        )
        .unwrap();
        let url = client.search_url("Portland, OR").unwrap();
        assert_eq!(
            url.as_str(),
            "https://us1.locationiq.com/v1/search.php?key=geo-key&q=Portland%2C+OR&format=json"
        );
    }
}
