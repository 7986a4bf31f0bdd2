use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use hostel_core::error::CoreError;
use serde_json::{json, Value};

/// Seconds a client should wait before retrying a `503`.
const RETRY_AFTER_SECS: &str = "1";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds the request-shape
/// failures axum's extractors report. Implements [`IntoResponse`] to
/// produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `hostel_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A malformed request body, query string, or path.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Status, code, message, and optional structured details for a core error.
fn describe_core(core: &CoreError) -> (StatusCode, &'static str, String, Option<Value>) {
    let message = core.to_string();
    match core {
        CoreError::Validation { field, reason } => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            message,
            Some(json!({ "field": field, "reason": reason })),
        ),
        CoreError::TemporalOrder {
            check_in,
            check_out,
        } => (
            StatusCode::BAD_REQUEST,
            "TEMPORAL_ORDER_ERROR",
            message,
            Some(json!({ "check_in": check_in, "check_out": check_out })),
        ),
        CoreError::IllegalTransition {
            reference,
            from,
            action,
        } => (
            StatusCode::CONFLICT,
            "ILLEGAL_TRANSITION",
            message,
            Some(json!({
                "reference": reference,
                "current_status": from,
                "action": action,
            })),
        ),
        CoreError::ImmutableRecord { reference, status } => (
            StatusCode::CONFLICT,
            "IMMUTABLE_RECORD",
            message,
            Some(json!({ "reference": reference, "current_status": status })),
        ),
        CoreError::RoomUnavailable {
            room_number,
            conflicting_reference,
        } => (
            StatusCode::CONFLICT,
            "ROOM_UNAVAILABLE",
            message,
            Some(json!({
                "room_number": room_number,
                "conflicting_reference": conflicting_reference,
            })),
        ),
        CoreError::NotFound { entity, reference } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} {reference} not found"),
            None,
        ),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone(), None),
        CoreError::StorageUnavailable(msg) => {
            tracing::warn!(error = %msg, "Booking storage unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORAGE_UNAVAILABLE",
                "Booking storage is temporarily unavailable; retry shortly".to_string(),
                None,
            )
        }
        CoreError::DuplicateReference(msg) => {
            tracing::error!(error = %msg, "Booking reference allocation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DUPLICATE_REFERENCE",
                "Could not allocate a unique booking reference".to_string(),
                None,
            )
        }
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            )
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            AppError::Core(core) => describe_core(&core),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(details) = details {
            body["details"] = details;
        }

        let mut response = (status, axum::Json(body)).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        response
    }
}
