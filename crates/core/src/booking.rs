//! Booking entity, raw request payload, and the validator & normalizer.
//!
//! [`validate_and_normalize`] is the single gate every write path goes
//! through: it turns an untrusted [`BookingPayload`] into
//! [`BookingDetails`] that satisfy the booking invariants, re-deriving
//! `nights` every time.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::ValidateEmail;

use crate::error::CoreError;
use crate::status::BookingStatus;
use crate::types::Timestamp;

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Milliseconds in one night of stay.
pub const MS_PER_NIGHT: i64 = 86_400_000;

/// Maximum length of the guest name after trimming.
pub const MAX_GUEST_NAME_LENGTH: usize = 200;

/// Maximum length of free-text notes.
pub const MAX_NOTES_LENGTH: usize = 5_000;

/* --------------------------------------------------------------------------
Types
-------------------------------------------------------------------------- */

/// Raw booking fields as received from an untrusted boundary.
///
/// Every field is an arbitrary JSON value so malformed input reaches the
/// validator (and produces a field-level error) instead of failing inside
/// the deserializer. Accepts both snake_case and the camelCase names sent by
/// the web clients. A JSON `null` is treated the same as an absent field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingPayload {
    #[serde(default, alias = "guestName", skip_serializing_if = "Option::is_none")]
    pub guest_name: Option<Value>,
    #[serde(default, alias = "guestEmail", skip_serializing_if = "Option::is_none")]
    pub guest_email: Option<Value>,
    #[serde(default, alias = "guestPhone", skip_serializing_if = "Option::is_none")]
    pub guest_phone: Option<Value>,
    #[serde(default, alias = "roomNumber", skip_serializing_if = "Option::is_none")]
    pub room_number: Option<Value>,
    #[serde(default, alias = "checkIn", skip_serializing_if = "Option::is_none")]
    pub check_in: Option<Value>,
    #[serde(default, alias = "checkOut", skip_serializing_if = "Option::is_none")]
    pub check_out: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Value>,
    /// Never accepted from callers; present so patches carrying it can be
    /// rejected explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Value>,
    /// Status only changes through transitions; rejected on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    /// Derived; any caller-supplied value is ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nights: Option<Value>,
}

/// Normalized, invariant-satisfying booking fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDetails {
    pub guest_name: String,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub room_number: String,
    pub check_in: Timestamp,
    pub check_out: Timestamp,
    pub nights: i32,
    pub amount: f64,
    pub notes: Option<String>,
}

/// A persisted booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub reference: String,
    pub status: BookingStatus,
    #[serde(flatten)]
    pub details: BookingDetails,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl BookingDetails {
    /// Render the details back into payload form, the base a patch is
    /// merged onto.
    pub fn to_payload(&self) -> BookingPayload {
        BookingPayload {
            guest_name: Some(Value::from(self.guest_name.clone())),
            guest_email: self.guest_email.clone().map(Value::from),
            guest_phone: self.guest_phone.clone().map(Value::from),
            room_number: Some(Value::from(self.room_number.clone())),
            check_in: Some(Value::from(self.check_in.to_rfc3339())),
            check_out: Some(Value::from(self.check_out.to_rfc3339())),
            amount: Some(Value::from(self.amount)),
            notes: self.notes.clone().map(Value::from),
            reference: None,
            status: None,
            nights: None,
        }
    }
}

/* --------------------------------------------------------------------------
Validation & normalization
-------------------------------------------------------------------------- */

/// Validate an untrusted payload and produce normalized booking details.
///
/// Trims every string, lower-cases the email, drops empty optional
/// strings, and derives `nights`. Fails with [`CoreError::Validation`] for
/// missing or malformed fields and [`CoreError::TemporalOrder`] when
/// check-out is not strictly after check-in.
pub fn validate_and_normalize(payload: &BookingPayload) -> Result<BookingDetails, CoreError> {
    let guest_name = require(
        "guest_name",
        text_field("guest_name", payload.guest_name.as_ref())?,
    )?;
    if guest_name.chars().count() > MAX_GUEST_NAME_LENGTH {
        return Err(CoreError::validation(
            "guest_name",
            format!("must be at most {MAX_GUEST_NAME_LENGTH} characters"),
        ));
    }

    let guest_email = text_field("guest_email", payload.guest_email.as_ref())?
        .map(|email| email.to_lowercase());
    if let Some(ref email) = guest_email {
        if !email.validate_email() {
            return Err(CoreError::validation(
                "guest_email",
                format!("'{email}' is not a valid email address"),
            ));
        }
    }

    let guest_phone = text_field("guest_phone", payload.guest_phone.as_ref())?;
    let room_number = require(
        "room_number",
        text_field("room_number", payload.room_number.as_ref())?,
    )?;

    let check_in = require(
        "check_in",
        timestamp_field("check_in", payload.check_in.as_ref())?,
    )?;
    let check_out = require(
        "check_out",
        timestamp_field("check_out", payload.check_out.as_ref())?,
    )?;
    if check_out <= check_in {
        return Err(CoreError::TemporalOrder {
            check_in,
            check_out,
        });
    }

    let amount = require("amount", amount_field(payload.amount.as_ref())?)?;

    let notes = text_field("notes", payload.notes.as_ref())?;
    if notes
        .as_ref()
        .is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH)
    {
        return Err(CoreError::validation(
            "notes",
            format!("must be at most {MAX_NOTES_LENGTH} characters"),
        ));
    }

    let nights = i32::try_from(compute_nights(check_in, check_out))
        .map_err(|_| CoreError::validation("check_out", "stay is too long"))?;

    Ok(BookingDetails {
        guest_name,
        guest_email,
        guest_phone,
        room_number,
        check_in,
        check_out,
        nights,
        amount,
        notes,
    })
}

/// Number of nights between two instants: `max(1, ceil(delta / 1 day))`.
///
/// Callers guarantee `check_out > check_in`.
pub fn compute_nights(check_in: Timestamp, check_out: Timestamp) -> i64 {
    let delta_ms = (check_out - check_in).num_milliseconds();
    let nights = if delta_ms > 0 {
        (delta_ms + MS_PER_NIGHT - 1) / MS_PER_NIGHT
    } else {
        0
    };
    nights.max(1)
}

/// Overlay `patch` onto an existing booking's details.
///
/// Absent (or `null`) patch fields keep the stored value; an empty string
/// on an optional field clears it once normalized. Patches carrying
/// `reference` or `status` are rejected. The result still has to go
/// through [`validate_and_normalize`].
pub fn merge_patch(
    existing: &BookingDetails,
    patch: &BookingPayload,
) -> Result<BookingPayload, CoreError> {
    if patch.reference.is_some() {
        return Err(CoreError::validation(
            "reference",
            "is assigned at creation and cannot be changed",
        ));
    }
    if patch.status.is_some() {
        return Err(CoreError::validation(
            "status",
            "can only be changed through confirm, cancel, or complete",
        ));
    }

    let base = existing.to_payload();
    Ok(BookingPayload {
        guest_name: patch.guest_name.clone().or(base.guest_name),
        guest_email: patch.guest_email.clone().or(base.guest_email),
        guest_phone: patch.guest_phone.clone().or(base.guest_phone),
        room_number: patch.room_number.clone().or(base.room_number),
        check_in: patch.check_in.clone().or(base.check_in),
        check_out: patch.check_out.clone().or(base.check_out),
        amount: patch.amount.clone().or(base.amount),
        notes: patch.notes.clone().or(base.notes),
        reference: None,
        status: None,
        nights: None,
    })
}

/* --------------------------------------------------------------------------
Field parsers
-------------------------------------------------------------------------- */

fn require<T>(field: &'static str, value: Option<T>) -> Result<T, CoreError> {
    value.ok_or_else(|| CoreError::validation(field, "is required"))
}

/// Trimmed text; empty becomes `None`. Numbers are accepted and rendered
/// as text (room numbers and phones often arrive as numbers).
fn text_field(field: &'static str, value: Option<&Value>) -> Result<Option<String>, CoreError> {
    let text = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => return Err(CoreError::validation(field, "must be a string")),
    };
    Ok(if text.is_empty() { None } else { Some(text) })
}

fn timestamp_field(
    field: &'static str,
    value: Option<&Value>,
) -> Result<Option<Timestamp>, CoreError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            parse_timestamp(s).map(Some).ok_or_else(|| {
                CoreError::validation(field, format!("'{s}' is not a valid date"))
            })
        }
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(Some)
            .ok_or_else(|| CoreError::validation(field, format!("{n} is not a valid timestamp"))),
        Some(_) => Err(CoreError::validation(
            field,
            "must be a date string or epoch milliseconds",
        )),
    }
}

/// Parse RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC), or a bare
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<Timestamp> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn amount_field(value: Option<&Value>) -> Result<Option<f64>, CoreError> {
    let amount = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    let amount = amount
        .filter(|a| a.is_finite())
        .ok_or_else(|| CoreError::validation("amount", "must be a number"))?;
    if amount < 0.0 {
        return Err(CoreError::validation("amount", "must not be negative"));
    }
    Ok(Some(amount))
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
