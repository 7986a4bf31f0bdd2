//! Persistence boundary for bookings.
//!
//! A store holds one document per booking keyed by `reference`. The only
//! atomicity it must offer is single-document: a unique insert and writes
//! conditioned on what the caller last read (status, and for detail edits
//! also `updated_at`). That is what makes transitions and edits
//! linearizable without a transaction API.

mod memory;

use std::future::Future;

pub use memory::InMemoryBookingStore;

use crate::booking::{Booking, BookingDetails};
use crate::error::CoreError;
use crate::search::BookingFilter;
use crate::status::BookingStatus;
use crate::types::Timestamp;

/// Document store for bookings.
///
/// Implementations map their own failures onto [`CoreError`]: transient
/// infrastructure problems become [`CoreError::StorageUnavailable`], a
/// taken reference becomes [`CoreError::DuplicateReference`], and a store
/// that enforces room availability itself reports
/// [`CoreError::RoomUnavailable`].
pub trait BookingStore: Send + Sync {
    /// Look up a booking by reference.
    fn find_one(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<Option<Booking>, CoreError>> + Send;

    /// Whether any booking already uses `reference`.
    fn exists_reference(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<bool, CoreError>> + Send;

    /// Insert a new `pending` booking. Never overwrites: an existing
    /// reference fails with [`CoreError::DuplicateReference`].
    fn insert(
        &self,
        reference: &str,
        details: &BookingDetails,
    ) -> impl Future<Output = Result<Booking, CoreError>> + Send;

    /// Replace the booking's details if it still has `expected_status` and
    /// `expected_updated_at`, i.e. nothing wrote to it since it was read.
    ///
    /// Every successful write must move `updated_at` forward. Returns `None`
    /// when the booking is missing or was changed in between.
    fn update_details_if_unchanged(
        &self,
        reference: &str,
        details: &BookingDetails,
        expected_status: BookingStatus,
        expected_updated_at: Timestamp,
    ) -> impl Future<Output = Result<Option<Booking>, CoreError>> + Send;

    /// Compare-and-swap the status from `expected` to `next`, bumping
    /// `updated_at`.
    ///
    /// Returns `None` when the booking is missing or its status is no
    /// longer `expected`.
    fn set_status_if(
        &self,
        reference: &str,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> impl Future<Output = Result<Option<Booking>, CoreError>> + Send;

    /// Non-cancelled bookings of `room_number` whose stay intersects
    /// `[check_in, check_out)`, skipping `exclude_reference`.
    fn find_overlapping(
        &self,
        room_number: &str,
        check_in: Timestamp,
        check_out: Timestamp,
        exclude_reference: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Booking>, CoreError>> + Send;

    /// List bookings matching `filter`, newest first.
    fn list(
        &self,
        filter: &BookingFilter,
    ) -> impl Future<Output = Result<Vec<Booking>, CoreError>> + Send;
}
