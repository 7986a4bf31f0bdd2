use std::sync::Arc;

use hostel_core::manager::BookingManager;
use hostel_db::PgBookingStore;

use crate::config::ServerConfig;

/// The booking manager as wired into the HTTP layer.
pub type Bookings = BookingManager<PgBookingStore>;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: hostel_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The only path through which bookings are created or changed.
    pub bookings: Arc<Bookings>,
}

impl AppState {
    /// Wire a booking manager over `pool` using the tunables in `config`.
    pub fn new(pool: hostel_db::DbPool, config: ServerConfig) -> Self {
        let bookings = BookingManager::new(
            PgBookingStore::new(pool.clone()),
            config.booking_config(),
        );
        Self {
            pool,
            config: Arc::new(config),
            bookings: Arc::new(bookings),
        }
    }
}
