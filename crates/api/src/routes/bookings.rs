//! Route definitions for bookings.
//!
//! Mounted at `/bookings` by `api_routes()`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::bookings;
use crate::state::AppState;

/// Booking routes.
///
/// ```text
/// POST   /                        -> create_booking
/// GET    /                        -> list_bookings
/// GET    /{reference}             -> get_booking
/// PATCH  /{reference}             -> update_booking
/// POST   /{reference}/{action}    -> transition_booking
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route(
            "/{reference}",
            get(bookings::get_booking).patch(bookings::update_booking),
        )
        .route("/{reference}/{action}", post(bookings::transition_booking))
}
