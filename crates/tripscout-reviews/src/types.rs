//! Provider response types for the business-search, review and geocoding APIs.
//!
//! ## Observed shapes
//!
//! ### Search records
//! Current Yelp Fusion responses nest the address under `location`
//! (`location.city`, `location.address1`, `location.display_address`).
//! Older payloads and some fixtures carry a flat `city` / `address` on the
//! business itself. Both are modelled here and resolved by
//! [`crate::normalize`].
//!
//! ### Malformed records
//! `id` and `rating` are kept as raw JSON values. Every other record field
//! goes through [`lenient`], so a wrongly typed value becomes `None` instead
//! of failing the page. A `businesses` element that is not an object at all
//! is dropped on its own. The normalizer decides what is usable.
//!
//! ### Geocoding
//! LocationIQ returns `lat` / `lon` as decimal strings, not numbers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One page of `GET /businesses/search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default, deserialize_with = "records")]
    pub businesses: Vec<RawSearchRecord>,
    #[serde(default, deserialize_with = "lenient")]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawSearchRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub location: Option<RawLocation>,
    #[serde(default, deserialize_with = "lenient")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub categories: Option<Vec<RawCategory>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawLocation {
    #[serde(default, deserialize_with = "lenient")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub address1: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub display_address: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawCategory {
    #[serde(default, deserialize_with = "lenient")]
    pub alias: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
}

/// Deserializes an optional field, mapping a value of the wrong type to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Deserializes `businesses` element by element, skipping elements that are
/// not record objects.
fn records<'de, D>(deserializer: D) -> Result<Vec<RawSearchRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    let total = values.len();
    let records: Vec<RawSearchRecord> = values
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    if records.len() < total {
        tracing::debug!(
            skipped = total - records.len(),
            "skipped search results that are not record objects"
        );
    }
    Ok(records)
}

/// Body of `GET /businesses/{id}/reviews`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewsResponse {
    #[serde(default)]
    pub reviews: Vec<ProviderReview>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProviderReview {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

/// One hit from the geocoder's free-text search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodePlace {
    pub display_name: String,
    pub lat: String,
    pub lon: String,
}

impl GeocodePlace {
    /// Parses the string coordinates into a [`GeoPoint`].
    ///
    /// Returns `None` if either coordinate is not a finite decimal.
    #[must_use]
    pub fn to_point(&self) -> Option<GeoPoint> {
        let latitude = self.lat.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
        let longitude = self.lon.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
        Some(GeoPoint {
            formatted_query: self.display_name.clone(),
            latitude,
            longitude,
        })
    }
}

/// A resolved location, ready to seed a [`tripscout_core::SearchQuery`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPoint {
    pub formatted_query: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_page_tolerates_malformed_rating() {
        let page: SearchPage = serde_json::from_value(serde_json::json!({
            "businesses": [
                { "id": "a", "name": "A", "rating": 4.5 },
                { "id": "b", "name": "B", "rating": "not-a-number" }
            ],
            "total": 2
        }))
        .expect("page should deserialize");
        assert_eq!(page.businesses.len(), 2);
        assert_eq!(page.total, Some(2));
    }

    #[test]
    fn wrongly_typed_fields_do_not_fail_the_page() {
        let page: SearchPage = serde_json::from_value(serde_json::json!({
            "businesses": [
                { "id": "good1", "name": "Good", "rating": 1 },
                { "id": "bad-name", "name": 42, "rating": 2 },
                { "id": "bad-location", "name": "Odd", "rating": 3,
                  "location": "somewhere", "categories": { "title": "Thai" } },
                { "id": "half-location", "name": "Half", "rating": 4,
                  "location": { "city": ["Portland"], "address1": "1 Main St" } },
                "not a record",
                { "id": "good2", "name": "Also Good", "rating": 5 }
            ],
            "total": "many"
        }))
        .expect("page should deserialize");

        let ids: Vec<&str> = page
            .businesses
            .iter()
            .filter_map(|r| r.id.as_ref().and_then(Value::as_str))
            .collect();
        assert_eq!(
            ids,
            vec!["good1", "bad-name", "bad-location", "half-location", "good2"]
        );
        assert_eq!(page.businesses[1].name, None);
        assert_eq!(page.businesses[2].location, None);
        assert_eq!(page.businesses[2].categories, None);
        let half = page.businesses[3].location.as_ref().expect("location object");
        assert_eq!(half.city, None);
        assert_eq!(half.address1.as_deref(), Some("1 Main St"));
        assert_eq!(page.total, None);
    }

    #[test]
    fn search_page_defaults_missing_businesses() {
        let page: SearchPage = serde_json::from_str("{}").expect("empty object");
        assert!(page.businesses.is_empty());
    }

    #[test]
    fn geocode_place_parses_string_coordinates() {
        let place = GeocodePlace {
            display_name: "Portland, Multnomah County, Oregon, USA".to_string(),
            lat: "45.5202471".to_string(),
            lon: "-122.6741949".to_string(),
        };
        let point = place.to_point().expect("valid coordinates");
        assert!((point.latitude - 45.520_247_1).abs() < 1e-9);
        assert!((point.longitude + 122.674_194_9).abs() < 1e-9);
        assert_eq!(point.formatted_query, place.display_name);
    }

    #[test]
    fn geocode_place_rejects_garbage_coordinates() {
        let place = GeocodePlace {
            display_name: "Nowhere".to_string(),
            lat: "north".to_string(),
            lon: "0".to_string(),
        };
        assert!(place.to_point().is_none());
    }
}
