use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tripscout_reviews::GeocodePlace;

use crate::middleware::RequestId;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct LocationParams {
    pub search: Option<String>,
}

/// `GET /api/location?search=..`: free-text place lookup, best match first.
pub(super) async fn search_locations(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<LocationParams>,
) -> Result<Json<Vec<GeocodePlace>>, ApiError> {
    let search = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("search is required"))?;

    let places = state.geocoder.search(search).await.map_err(|e| {
        tracing::error!(request_id = %req_id.0, search, error = %e, "location search failed");
        ApiError::new(StatusCode::BAD_GATEWAY, "location provider unavailable")
    })?;

    tracing::debug!(request_id = %req_id.0, search, hits = places.len(), "location search");
    Ok(Json(places))
}
