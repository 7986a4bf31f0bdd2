//! Row model for the `bookings` table.

use hostel_core::booking::{Booking, BookingDetails};
use hostel_core::error::CoreError;
use hostel_core::status::BookingStatus;
use hostel_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `bookings` table.
#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub reference: String,
    pub guest_name: String,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub room_number: String,
    pub status: String,
    pub check_in: Timestamp,
    pub check_out: Timestamp,
    pub nights: i32,
    pub amount: f64,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<BookingRow> for Booking {
    type Error = CoreError;

    /// Fails only if the row holds a status the CHECK constraint should
    /// have rejected.
    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = BookingStatus::parse(&row.status).map_err(|_| {
            CoreError::Internal(format!(
                "booking {} has unknown status '{}'",
                row.reference, row.status
            ))
        })?;

        Ok(Booking {
            reference: row.reference,
            status,
            details: BookingDetails {
                guest_name: row.guest_name,
                guest_email: row.guest_email,
                guest_phone: row.guest_phone,
                room_number: row.room_number,
                check_in: row.check_in,
                check_out: row.check_out,
                nights: row.nights,
                amount: row.amount,
                notes: row.notes,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
