//! Repository for the `bookings` table.
//!
//! Every write touches exactly one row. Conditional writes carry what the
//! caller last read in their `WHERE` clause, which is what lets the manager
//! treat them as compare-and-swap operations.

use hostel_core::booking::BookingDetails;
use hostel_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::booking::BookingRow;

/// Column list for `bookings` queries.
const COLUMNS: &str = "\
    reference, guest_name, guest_email, guest_phone, room_number, status, \
    check_in, check_out, nights, amount, notes, created_at, updated_at";

/// `updated_at` for a write. Strictly later than the previous value even
/// when two writes land within the same clock tick.
const NEXT_UPDATED_AT: &str = "GREATEST(NOW(), updated_at + INTERVAL '1 microsecond')";

/// Provides the queries behind [`crate::PgBookingStore`].
pub struct BookingRepo;

impl BookingRepo {
    /// Insert a new booking with the default `pending` status.
    pub async fn create(
        pool: &PgPool,
        reference: &str,
        input: &BookingDetails,
    ) -> Result<BookingRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO bookings \
                (reference, guest_name, guest_email, guest_phone, room_number, \
                 check_in, check_out, nights, amount, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(reference)
            .bind(&input.guest_name)
            .bind(&input.guest_email)
            .bind(&input.guest_phone)
            .bind(&input.room_number)
            .bind(input.check_in)
            .bind(input.check_out)
            .bind(input.nights)
            .bind(input.amount)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    /// Find a booking by reference.
    pub async fn find_by_reference(
        pool: &PgPool,
        reference: &str,
    ) -> Result<Option<BookingRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bookings WHERE reference = $1");
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(reference)
            .fetch_optional(pool)
            .await
    }

    /// Whether a booking with this reference exists.
    pub async fn exists_reference(pool: &PgPool, reference: &str) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM bookings WHERE reference = $1)")
                .bind(reference)
                .fetch_one(pool)
                .await?;
        Ok(exists)
    }

    /// Replace the editable fields if the row still has `expected_status`
    /// and `expected_updated_at`.
    ///
    /// Returns `None` if the booking is missing or was written since it was
    /// read.
    pub async fn update_details_if_unchanged(
        pool: &PgPool,
        reference: &str,
        input: &BookingDetails,
        expected_status: &str,
        expected_updated_at: Timestamp,
    ) -> Result<Option<BookingRow>, sqlx::Error> {
        let query = format!(
            "UPDATE bookings SET \
                guest_name = $4, guest_email = $5, guest_phone = $6, room_number = $7, \
                check_in = $8, check_out = $9, nights = $10, amount = $11, notes = $12, \
                updated_at = {NEXT_UPDATED_AT} \
             WHERE reference = $1 AND status = $2 AND updated_at = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(reference)
            .bind(expected_status)
            .bind(expected_updated_at)
            .bind(&input.guest_name)
            .bind(&input.guest_email)
            .bind(&input.guest_phone)
            .bind(&input.room_number)
            .bind(input.check_in)
            .bind(input.check_out)
            .bind(input.nights)
            .bind(input.amount)
            .bind(&input.notes)
            .fetch_optional(pool)
            .await
    }

    /// Move the status from `expected` to `next` in one conditional write.
    ///
    /// Returns `None` if the booking is missing or its status is no longer
    /// `expected`.
    pub async fn set_status_if(
        pool: &PgPool,
        reference: &str,
        expected: &str,
        next: &str,
    ) -> Result<Option<BookingRow>, sqlx::Error> {
        let query = format!(
            "UPDATE bookings SET status = $3, updated_at = {NEXT_UPDATED_AT} \
             WHERE reference = $1 AND status = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(reference)
            .bind(expected)
            .bind(next)
            .fetch_optional(pool)
            .await
    }

    /// Live (non-cancelled) bookings of a room whose stay intersects
    /// `[check_in, check_out)`.
    pub async fn find_overlapping(
        pool: &PgPool,
        room_number: &str,
        check_in: Timestamp,
        check_out: Timestamp,
        exclude_reference: Option<&str>,
    ) -> Result<Vec<BookingRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bookings \
             WHERE room_number = $1 \
               AND status <> 'cancelled' \
               AND check_in < $3 AND check_out > $2 \
               AND ($4::TEXT IS NULL OR reference <> $4) \
             ORDER BY check_in"
        );
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(room_number)
            .bind(check_in)
            .bind(check_out)
            .bind(exclude_reference)
            .fetch_all(pool)
            .await
    }

    /// List bookings with optional filters for status and room.
    ///
    /// Results are ordered newest-first.
    pub async fn list_filtered(
        pool: &PgPool,
        status: Option<&str>,
        room_number: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BookingRow>, sqlx::Error> {
        let mut conditions: Vec<String> = Vec::new();
        let mut param_idx: usize = 1;

        if status.is_some() {
            conditions.push(format!("status = ${param_idx}"));
            param_idx += 1;
        }
        if room_number.is_some() {
            conditions.push(format!("room_number = ${param_idx}"));
            param_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM bookings {where_clause} \
             ORDER BY created_at DESC, reference DESC \
             LIMIT ${param_idx} OFFSET ${}",
            param_idx + 1
        );

        let mut q = sqlx::query_as::<_, BookingRow>(&query);

        if let Some(s) = status {
            q = q.bind(s);
        }
        if let Some(room) = room_number {
            q = q.bind(room);
        }
        q = q.bind(limit).bind(offset);

        q.fetch_all(pool).await
    }
}
