//! The HTTP surface of the booking service.
//!
//! [`build_app_router`] is used by both the binary and the integration
//! tests, so requests in tests pass through the same layers as in
//! production.

use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

/// Prefix for the booking endpoints. `/health` sits outside it.
pub const API_PREFIX: &str = "/api/v1";

/// Correlates a request with its log lines. A client-supplied value is
/// kept; otherwise a UUID is assigned.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// How long browsers may cache a CORS preflight answer.
const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

/// Build the booking service router.
///
/// The request id is assigned outside the trace layer so every span
/// carries it. The whole-request timeout sits above the per-call storage
/// timeout the manager applies, so a slow store surfaces as a `503` with
/// `Retry-After` rather than a `408`.
pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(routes::health::router())
        .nest(API_PREFIX, routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(booking_cors(&config.cors_origins))
        .with_state(state)
}

/// CORS for browser clients of the booking endpoints: reads, creation,
/// actions (`POST`) and partial edits (`PATCH`), all with JSON bodies.
///
/// Origins were validated when the configuration was loaded.
fn booking_cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE)
}
