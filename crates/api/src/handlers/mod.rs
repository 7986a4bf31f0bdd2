//! Request handlers.
//!
//! Handlers delegate to the booking manager in [`crate::state::AppState`]
//! and map errors via [`crate::error::AppError`].

pub mod bookings;
