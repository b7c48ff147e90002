mod location;
mod reviews;

use std::any::Any;
use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tripscout_core::AppConfig;
use tripscout_reviews::{GeocodeClient, HttpOptions, RateLimiter, YelpPipeline};

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, BearerAuth, InboundRateLimit,
};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<YelpPipeline>,
    pub geocoder: Arc<GeocodeClient>,
}

impl AppState {
    /// Wires the pipeline and geocoder from config. One detail-call
    /// [`RateLimiter`] is shared by every request the process serves.
    pub fn from_app_config(config: &AppConfig) -> anyhow::Result<Self> {
        let limiter = Arc::new(RateLimiter::new(std::time::Duration::from_millis(
            config.detail_min_interval_ms,
        )));
        let pipeline = YelpPipeline::from_app_config(config, limiter)?;
        let geocoder = GeocodeClient::with_base_url(
            &config.geocode_api_key,
            &config.geocode_base_url,
            &HttpOptions::from_app_config(config),
        )?;
        Ok(Self {
            pipeline: Arc::new(pipeline),
            geocoder: Arc::new(geocoder),
        })
    }
}

/// Error body returned by every route: `{ "error": "<message>" }`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            error: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: BearerAuth, rate_limit: InboundRateLimit) -> Router<AppState> {
    Router::new()
        .route("/api/reviews", get(reviews::get_reviews))
        .route("/api/location", get(location::search_locations))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: BearerAuth, rate_limit: InboundRateLimit) -> Router {
    let public_routes = Router::new().route("/api/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id))
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
        .with_state(state)
}

async fn health() -> Json<HealthData> {
    Json(HealthData { status: "ok" })
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(panic = detail, "request handler panicked");
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
