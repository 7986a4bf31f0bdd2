//! Room availability: half-open stay ranges on the same room must not
//! intersect unless one of the bookings is cancelled.

use crate::booking::Booking;
use crate::status::BookingStatus;
use crate::types::Timestamp;

/// Whether `[a_in, a_out)` and `[b_in, b_out)` share any instant.
///
/// Back-to-back stays (one checks out when the next checks in) do not
/// overlap.
pub fn ranges_overlap(
    a_in: Timestamp,
    a_out: Timestamp,
    b_in: Timestamp,
    b_out: Timestamp,
) -> bool {
    a_in < b_out && b_in < a_out
}

/// Whether `existing` blocks a stay of `[check_in, check_out)` in
/// `room_number`.
///
/// Cancelled bookings never block. `exclude_reference` lets an update skip
/// the booking being edited.
pub fn blocks_stay(
    existing: &Booking,
    room_number: &str,
    check_in: Timestamp,
    check_out: Timestamp,
    exclude_reference: Option<&str>,
) -> bool {
    existing.status != BookingStatus::Cancelled
        && existing.details.room_number == room_number
        && exclude_reference != Some(existing.reference.as_str())
        && ranges_overlap(
            existing.details.check_in,
            existing.details.check_out,
            check_in,
            check_out,
        )
}
