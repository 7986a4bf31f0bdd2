//! PostgreSQL-backed [`BookingStore`].

use hostel_core::booking::{Booking, BookingDetails};
use hostel_core::error::CoreError;
use hostel_core::search::BookingFilter;
use hostel_core::status::BookingStatus;
use hostel_core::store::BookingStore;
use hostel_core::types::Timestamp;

use crate::models::booking::BookingRow;
use crate::repositories::BookingRepo;
use crate::DbPool;

/// PostgreSQL unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL exclusion constraint violation (room overlap).
const EXCLUSION_VIOLATION: &str = "23P01";

/// SQLSTATE codes that indicate a transient condition worth retrying.
const TRANSIENT_CODES: &[&str] = &["40001", "40P01", "53300", "57P01", "57P02", "57P03"];

/// Booking store over the `bookings` table.
#[derive(Debug, Clone)]
pub struct PgBookingStore {
    pool: DbPool,
}

impl PgBookingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Translate an exclusion violation into the conflicting booking, if
    /// it can still be found.
    async fn room_unavailable(
        &self,
        details: &BookingDetails,
        exclude_reference: Option<&str>,
    ) -> CoreError {
        let conflicting_reference = BookingRepo::find_overlapping(
            &self.pool,
            &details.room_number,
            details.check_in,
            details.check_out,
            exclude_reference,
        )
        .await
        .ok()
        .and_then(|rows| rows.into_iter().next())
        .map(|row| row.reference)
        .unwrap_or_default();

        CoreError::RoomUnavailable {
            room_number: details.room_number.clone(),
            conflicting_reference,
        }
    }
}

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Map a sqlx error onto the core error taxonomy.
///
/// Connection-level and transient failures become
/// [`CoreError::StorageUnavailable`]; anything else is internal.
fn classify_sqlx_error(err: sqlx::Error) -> CoreError {
    match &err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => {
            tracing::warn!(error = %err, "Booking store unavailable");
            CoreError::StorageUnavailable(err.to_string())
        }
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
            if code.starts_with("08") || TRANSIENT_CODES.contains(&code.as_str()) {
                tracing::warn!(error = %db_err, %code, "Transient database error");
                CoreError::StorageUnavailable(db_err.to_string())
            } else {
                tracing::error!(error = %db_err, %code, "Database error");
                CoreError::Internal(db_err.to_string())
            }
        }
        _ => {
            tracing::error!(error = %err, "Database error");
            CoreError::Internal(err.to_string())
        }
    }
}

fn into_booking(row: BookingRow) -> Result<Booking, CoreError> {
    Booking::try_from(row)
}

fn into_optional(row: Option<BookingRow>) -> Result<Option<Booking>, CoreError> {
    row.map(into_booking).transpose()
}

impl BookingStore for PgBookingStore {
    async fn find_one(&self, reference: &str) -> Result<Option<Booking>, CoreError> {
        let row = BookingRepo::find_by_reference(&self.pool, reference)
            .await
            .map_err(classify_sqlx_error)?;
        into_optional(row)
    }

    async fn exists_reference(&self, reference: &str) -> Result<bool, CoreError> {
        BookingRepo::exists_reference(&self.pool, reference)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn insert(
        &self,
        reference: &str,
        details: &BookingDetails,
    ) -> Result<Booking, CoreError> {
        match BookingRepo::create(&self.pool, reference, details).await {
            Ok(row) => into_booking(row),
            Err(err) => match sqlstate(&err).as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    Err(CoreError::DuplicateReference(reference.to_string()))
                }
                Some(EXCLUSION_VIOLATION) => Err(self.room_unavailable(details, None).await),
                _ => Err(classify_sqlx_error(err)),
            },
        }
    }

    async fn update_details_if_unchanged(
        &self,
        reference: &str,
        details: &BookingDetails,
        expected_status: BookingStatus,
        expected_updated_at: Timestamp,
    ) -> Result<Option<Booking>, CoreError> {
        match BookingRepo::update_details_if_unchanged(
            &self.pool,
            reference,
            details,
            expected_status.as_str(),
            expected_updated_at,
        )
        .await
        {
            Ok(row) => into_optional(row),
            Err(err) if sqlstate(&err).as_deref() == Some(EXCLUSION_VIOLATION) => {
                Err(self.room_unavailable(details, Some(reference)).await)
            }
            Err(err) => Err(classify_sqlx_error(err)),
        }
    }

    async fn set_status_if(
        &self,
        reference: &str,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<Option<Booking>, CoreError> {
        let row =
            BookingRepo::set_status_if(&self.pool, reference, expected.as_str(), next.as_str())
                .await
                .map_err(classify_sqlx_error)?;
        into_optional(row)
    }

    async fn find_overlapping(
        &self,
        room_number: &str,
        check_in: Timestamp,
        check_out: Timestamp,
        exclude_reference: Option<&str>,
    ) -> Result<Vec<Booking>, CoreError> {
        BookingRepo::find_overlapping(
            &self.pool,
            room_number,
            check_in,
            check_out,
            exclude_reference,
        )
        .await
        .map_err(classify_sqlx_error)?
        .into_iter()
        .map(into_booking)
        .collect()
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, CoreError> {
        BookingRepo::list_filtered(
            &self.pool,
            filter.status.map(|s| s.as_str()),
            filter.room_number.as_deref(),
            filter.limit,
            filter.offset,
        )
        .await
        .map_err(classify_sqlx_error)?
        .into_iter()
        .map(into_booking)
        .collect()
    }
}
