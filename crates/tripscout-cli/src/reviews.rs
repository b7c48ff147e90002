//! Command handlers for `reviews` and `locate`.
//!
//! Both share the server's wiring: the same config, the same pipeline, and
//! the same geocoder. Results go to stdout as pretty JSON; logs go to stderr.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tripscout_core::{AppConfig, SearchQuery};
use tripscout_reviews::{GeocodeClient, HttpOptions, RateLimiter, YelpPipeline};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Origin {
    Coordinates { latitude: f64, longitude: f64 },
    City(String),
}

fn geocoder(config: &AppConfig) -> anyhow::Result<GeocodeClient> {
    GeocodeClient::with_base_url(
        &config.geocode_api_key,
        &config.geocode_base_url,
        &HttpOptions::from_app_config(config),
    )
    .map_err(|e| anyhow::anyhow!("failed to build geocode client: {e}"))
}

/// Resolve the origin, run the aggregation pipeline, and print the results.
///
/// # Errors
///
/// Returns an error if a city cannot be geocoded, a client cannot be built,
/// or every search page failed.
pub(crate) async fn run_reviews(
    config: &AppConfig,
    origin: Origin,
    keyword: &str,
) -> anyhow::Result<()> {
    let (latitude, longitude) = match origin {
        Origin::Coordinates {
            latitude,
            longitude,
        } => (latitude, longitude),
        Origin::City(city) => {
            let point = geocoder(config)?
                .locate(&city)
                .await?
                .ok_or_else(|| anyhow::anyhow!("could not find coordinates for \"{city}\""))?;
            tracing::info!(city = %city, resolved = %point.formatted_query, "city geocoded");
            (point.latitude, point.longitude)
        }
    };

    let limiter = Arc::new(RateLimiter::new(Duration::from_millis(
        config.detail_min_interval_ms,
    )));
    let pipeline = YelpPipeline::from_app_config(config, limiter)?;
    let results = pipeline
        .aggregate(&SearchQuery::new(latitude, longitude, keyword))
        .await?;

    print_json(&results)
}

/// Print every geocoder match for `query`.
///
/// # Errors
///
/// Returns an error if the geocoder cannot be reached or answers with an
/// unexpected status.
pub(crate) async fn run_locate(config: &AppConfig, query: &str) -> anyhow::Result<()> {
    let places = geocoder(config)?.search(query).await?;
    if places.is_empty() {
        tracing::warn!(query, "no locations matched");
    }
    print_json(&places)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
