//! Repository layer: one struct of static query functions per table.

pub mod booking_repo;

pub use booking_repo::BookingRepo;
