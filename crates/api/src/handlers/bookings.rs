//! Handlers for hostel bookings.
//!
//! Every write goes through [`hostel_core::manager::BookingManager`]; the
//! handlers only translate HTTP input into manager calls.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use hostel_core::booking::BookingPayload;
use hostel_core::search::BookingFilter;
use hostel_core::status::{BookingAction, BookingStatus};

use crate::error::AppResult;
use crate::query::BookingListParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// POST /bookings
// ---------------------------------------------------------------------------

/// Create a booking. The reference is generated and the status is `pending`.
pub async fn create_booking(
    State(state): State<AppState>,
    payload: Result<Json<BookingPayload>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let booking = state.bookings.create_booking(&payload).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: booking })))
}

// ---------------------------------------------------------------------------
// GET /bookings
// ---------------------------------------------------------------------------

/// List bookings newest-first with optional `status` and `room_number` filters.
pub async fn list_bookings(
    State(state): State<AppState>,
    params: Result<Query<BookingListParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;

    let status = params
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(BookingStatus::parse)
        .transpose()?;

    let filter = BookingFilter::new(status, params.room_number, params.limit, params.offset);
    let bookings = state.bookings.list_bookings(&filter).await?;

    Ok(Json(DataResponse { data: bookings }))
}

// ---------------------------------------------------------------------------
// GET /bookings/{reference}
// ---------------------------------------------------------------------------

pub async fn get_booking(
    State(state): State<AppState>,
    reference: Result<Path<String>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(reference) = reference?;
    let booking = state.bookings.get_booking(&reference).await?;

    Ok(Json(DataResponse { data: booking }))
}

// ---------------------------------------------------------------------------
// PATCH /bookings/{reference}
// ---------------------------------------------------------------------------

/// Apply a partial edit. Omitted fields keep their stored value.
pub async fn update_booking(
    State(state): State<AppState>,
    reference: Result<Path<String>, PathRejection>,
    patch: Result<Json<BookingPayload>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(reference) = reference?;
    let Json(patch) = patch?;
    let booking = state.bookings.update_booking(&reference, &patch).await?;

    Ok(Json(DataResponse { data: booking }))
}

// ---------------------------------------------------------------------------
// POST /bookings/{reference}/{action}
// ---------------------------------------------------------------------------

/// Run a lifecycle action (`confirm`, `cancel`, `complete`).
pub async fn transition_booking(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let Path((reference, action)) = path?;
    let action = BookingAction::parse(&action)?;
    let booking = state.bookings.transition_booking(&reference, action).await?;

    Ok(Json(DataResponse { data: booking }))
}
