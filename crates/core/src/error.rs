use crate::status::{BookingAction, BookingStatus};
use crate::types::Timestamp;

/// Domain errors raised by the booking lifecycle.
///
/// Every variant carries enough structure (field name, current status,
/// attempted action) for the API layer to build a user-facing message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Check-out ({check_out}) must be strictly after check-in ({check_in})")]
    TemporalOrder {
        check_in: Timestamp,
        check_out: Timestamp,
    },

    #[error("Cannot {action} booking {reference} while it is {from}")]
    IllegalTransition {
        reference: String,
        from: BookingStatus,
        action: BookingAction,
    },

    #[error("Booking {reference} is {status} and can no longer be edited")]
    ImmutableRecord {
        reference: String,
        status: BookingStatus,
    },

    #[error("Room {room_number} is already booked for an overlapping stay ({conflicting_reference})")]
    RoomUnavailable {
        room_number: String,
        conflicting_reference: String,
    },

    #[error("Entity not found: {entity} with reference {reference}")]
    NotFound {
        entity: &'static str,
        reference: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Could not allocate a unique booking reference: {0}")]
    DuplicateReference(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::Validation`] on `field`.
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}
