pub mod bookings;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /bookings                                        list, create
/// /bookings/{reference}                            get, update (PATCH)
/// /bookings/{reference}/{action}                   confirm, cancel, complete (POST)
/// ```
///
/// The health check (`/health`) is mounted at the root level, not here.
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/bookings", bookings::router())
}
