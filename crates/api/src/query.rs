//! Query parameter types for API handlers.

use serde::Deserialize;

/// Query parameters for `GET /bookings`.
///
/// Pagination values are clamped by [`hostel_core::search::BookingFilter::new`].
#[derive(Debug, Default, Deserialize)]
pub struct BookingListParams {
    pub status: Option<String>,
    pub room_number: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
