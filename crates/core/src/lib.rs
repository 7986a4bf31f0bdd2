//! Booking lifecycle core for the hostel booking service.
//!
//! Owns the rules that turn a raw booking request into a validated,
//! uniquely-referenced reservation and govern how its status may change.
//! Persistence is abstracted behind [`store::BookingStore`].

pub mod availability;
pub mod booking;
pub mod error;
pub mod manager;
pub mod reference;
pub mod search;
pub mod status;
pub mod store;
pub mod types;
