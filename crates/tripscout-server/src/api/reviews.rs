use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tripscout_core::{EnrichedResult, SearchQuery};
use tripscout_reviews::PipelineError;

use crate::middleware::RequestId;

use super::{ApiError, AppState};

/// Raw query string for `GET /api/reviews`. Numbers arrive as strings so a
/// malformed value gets the JSON error body rather than axum's plain-text
/// rejection.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ReviewsParams {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub city: Option<String>,
    pub keyword: Option<String>,
}

/// Where the search should be centered.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Origin {
    Coordinates { latitude: f64, longitude: f64 },
    City(String),
}

/// Validates the query string. Explicit coordinates win over `city`.
pub(super) fn parse_params(params: &ReviewsParams) -> Result<(Origin, String), ApiError> {
    let keyword = non_blank(params.keyword.as_deref())
        .ok_or_else(|| ApiError::bad_request("keyword is required"))?;

    let latitude = non_blank(params.latitude.as_deref());
    let longitude = non_blank(params.longitude.as_deref());

    let origin = match (latitude, longitude) {
        (Some(lat), Some(lon)) => Origin::Coordinates {
            latitude: parse_coordinate("latitude", &lat, 90.0)?,
            longitude: parse_coordinate("longitude", &lon, 180.0)?,
        },
        (Some(_), None) | (None, Some(_)) => {
            return Err(ApiError::bad_request(
                "latitude and longitude must be given together",
            ));
        }
        (None, None) => match non_blank(params.city.as_deref()) {
            Some(city) => Origin::City(city),
            None => {
                return Err(ApiError::bad_request(
                    "either latitude and longitude or city is required",
                ));
            }
        },
    };

    Ok((origin, keyword))
}

fn parse_coordinate(name: &str, raw: &str, bound: f64) -> Result<f64, ApiError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() <= bound)
        .ok_or_else(|| {
            ApiError::bad_request(format!("{name} must be a number between -{bound} and {bound}"))
        })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

pub(super) async fn get_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ReviewsParams>,
) -> Result<Json<Vec<EnrichedResult>>, ApiError> {
    let (origin, keyword) = parse_params(&params)?;

    let (latitude, longitude) = match origin {
        Origin::Coordinates {
            latitude,
            longitude,
        } => (latitude, longitude),
        Origin::City(city) => {
            let point = state
                .geocoder
                .locate(&city)
                .await
                .map_err(|e| {
                    tracing::error!(request_id = %req_id.0, city = %city, error = %e, "geocoding failed");
                    ApiError::new(StatusCode::BAD_GATEWAY, "location provider unavailable")
                })?
                .ok_or_else(|| {
                    ApiError::new(
                        StatusCode::NOT_FOUND,
                        format!("could not find coordinates for \"{city}\""),
                    )
                })?;
            tracing::debug!(
                request_id = %req_id.0,
                resolved = %point.formatted_query,
                "city geocoded"
            );
            (point.latitude, point.longitude)
        }
    };

    let query = SearchQuery::new(latitude, longitude, keyword);
    let results = state
        .pipeline
        .aggregate(&query)
        .await
        .map_err(|e| map_pipeline_error(&req_id, &e))?;

    Ok(Json(results))
}

fn map_pipeline_error(req_id: &RequestId, error: &PipelineError) -> ApiError {
    tracing::error!(request_id = %req_id.0, error = %error, "review aggregation failed");
    match error {
        PipelineError::AllPagesFailed { .. } => {
            ApiError::new(StatusCode::BAD_GATEWAY, "business provider unavailable")
        }
        PipelineError::InvalidConfig(_) | PipelineError::ClientBuild(_) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error",
        ),
    }
}
