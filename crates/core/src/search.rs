//! Listing filters and pagination clamping.

use crate::status::BookingStatus;

/// Default page size for booking listings.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Largest page size a caller may request.
pub const MAX_LIST_LIMIT: i64 = 200;

/// Filter for listing bookings, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub room_number: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl BookingFilter {
    /// Build a filter with clamped pagination.
    pub fn new(
        status: Option<BookingStatus>,
        room_number: Option<String>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Self {
        Self {
            status,
            room_number: room_number
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            limit: clamp_limit(limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT),
            offset: clamp_offset(offset),
        }
    }
}

/// Clamp a user-provided limit to `1..=max`, using `default` when absent.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}
