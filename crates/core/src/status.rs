//! Booking status lifecycle.
//!
//! ```text
//! pending ──confirm──> confirmed ──complete──> completed
//!    │                     │
//!    └───────cancel────────┴──────────────────> cancelled
//! ```
//!
//! `cancelled` and `completed` are terminal. All transition rules live in
//! [`valid_actions`]; nothing else compares status strings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// The four states a booking can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

/// All valid status strings, in lifecycle order.
pub const VALID_STATUSES: &[&str] = &["pending", "confirmed", "cancelled", "completed"];

impl BookingStatus {
    /// Return the status as a lowercase string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Parse a status from its lowercase string form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            _ => Err(CoreError::validation(
                "status",
                format!(
                    "'{s}' is not a booking status. Must be one of: {}",
                    VALID_STATUSES.join(", ")
                ),
            )),
        }
    }

    /// A terminal booking accepts no transitions and no edits.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }

    /// Apply `action`, returning the resulting status.
    ///
    /// The `reference` is only used to build the error.
    pub fn apply(self, action: BookingAction, reference: &str) -> Result<Self, CoreError> {
        if valid_actions(self).contains(&action) {
            Ok(action.target())
        } else {
            Err(CoreError::IllegalTransition {
                reference: reference.to_string(),
                from: self,
                action,
            })
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Operations that move a booking between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingAction {
    Confirm,
    Cancel,
    Complete,
}

/// All valid action strings.
pub const VALID_ACTIONS: &[&str] = &["confirm", "cancel", "complete"];

impl BookingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::Complete => "complete",
        }
    }

    /// Parse an action from its lowercase string form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "confirm" => Ok(Self::Confirm),
            "cancel" => Ok(Self::Cancel),
            "complete" => Ok(Self::Complete),
            _ => Err(CoreError::validation(
                "action",
                format!(
                    "'{s}' is not a booking action. Must be one of: {}",
                    VALID_ACTIONS.join(", ")
                ),
            )),
        }
    }

    /// The status a booking lands in after this action.
    pub fn target(&self) -> BookingStatus {
        match self {
            Self::Confirm => BookingStatus::Confirmed,
            Self::Cancel => BookingStatus::Cancelled,
            Self::Complete => BookingStatus::Completed,
        }
    }
}

impl fmt::Display for BookingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Returns the actions allowed from `from`.
///
/// - `pending`   -> confirm, cancel
/// - `confirmed` -> complete, cancel
/// - `cancelled`, `completed` -> none
pub fn valid_actions(from: BookingStatus) -> &'static [BookingAction] {
    match from {
        BookingStatus::Pending => &[BookingAction::Confirm, BookingAction::Cancel],
        BookingStatus::Confirmed => &[BookingAction::Complete, BookingAction::Cancel],
        BookingStatus::Cancelled | BookingStatus::Completed => &[],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
