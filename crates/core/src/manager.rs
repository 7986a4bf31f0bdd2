//! The booking lifecycle manager.
//!
//! [`BookingManager`] is the only way bookings are created or changed.
//! It holds no mutable state of its own: every operation is one
//! read-validate-write unit against the [`BookingStore`], and every write
//! is conditioned on what was read at the start, so concurrent callers on
//! the same booking cannot both win a transition or both land an edit.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;

use crate::booking::{
    merge_patch, validate_and_normalize, Booking, BookingDetails, BookingPayload,
};
use crate::error::CoreError;
use crate::reference::{
    generate_reference, is_valid_reference, DEFAULT_MAX_REFERENCE_ATTEMPTS,
};
use crate::search::BookingFilter;
use crate::status::{BookingAction, BookingStatus};
use crate::store::BookingStore;

/// Default bound on a single storage call.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for [`BookingManager`].
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Upper bound on any single store call. Elapsing it surfaces
    /// [`CoreError::StorageUnavailable`].
    pub storage_timeout: Duration,
    /// How many fresh references to try before failing a creation with
    /// [`CoreError::DuplicateReference`].
    pub max_reference_attempts: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
            max_reference_attempts: DEFAULT_MAX_REFERENCE_ATTEMPTS,
        }
    }
}

/// Creates, edits, transitions, and looks up bookings.
#[derive(Debug)]
pub struct BookingManager<S> {
    store: S,
    config: BookingConfig,
}

impl<S: BookingStore> BookingManager<S> {
    pub fn new(store: S, config: BookingConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Validate `payload` and persist it as a new `pending` booking under a
    /// freshly generated reference.
    pub async fn create_booking(&self, payload: &BookingPayload) -> Result<Booking, CoreError> {
        if payload.reference.is_some() {
            return Err(CoreError::validation(
                "reference",
                "is generated by the server and cannot be supplied",
            ));
        }
        if let Some(status) = &payload.status {
            if status.as_str().map(str::trim) != Some(BookingStatus::Pending.as_str()) {
                return Err(CoreError::validation(
                    "status",
                    "new bookings always start as pending",
                ));
            }
        }

        let details = validate_and_normalize(payload)?;
        self.ensure_room_available(&details, None).await?;

        let attempts = self.config.max_reference_attempts.max(1);
        for attempt in 1..=attempts {
            let reference = generate_reference(Utc::now());

            if self
                .guarded("exists_reference", self.store.exists_reference(&reference))
                .await?
            {
                tracing::warn!(%reference, attempt, "Generated booking reference already taken");
                continue;
            }

            match self
                .guarded("insert", self.store.insert(&reference, &details))
                .await
            {
                Ok(booking) => {
                    tracing::info!(
                        reference = %booking.reference,
                        room_number = %booking.details.room_number,
                        nights = booking.details.nights,
                        "Booking created",
                    );
                    return Ok(booking);
                }
                Err(CoreError::DuplicateReference(_)) => {
                    tracing::warn!(%reference, attempt, "Booking reference claimed concurrently");
                }
                Err(e) => return Err(e),
            }
        }

        Err(CoreError::DuplicateReference(format!(
            "no unique reference after {attempts} attempts"
        )))
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Apply a partial edit to a non-terminal booking.
    ///
    /// The patch is merged over the stored record and the whole result is
    /// re-validated, so `nights` is always re-derived. The write only lands
    /// if the record is exactly as read; any write in between (another edit
    /// or a transition) turns this call into a [`CoreError::Conflict`], or
    /// [`CoreError::ImmutableRecord`] if the booking became terminal.
    pub async fn update_booking(
        &self,
        reference: &str,
        patch: &BookingPayload,
    ) -> Result<Booking, CoreError> {
        let current = self.load(reference).await?;
        if current.status.is_terminal() {
            return Err(CoreError::ImmutableRecord {
                reference: current.reference,
                status: current.status,
            });
        }

        let merged = merge_patch(&current.details, patch)?;
        let details = validate_and_normalize(&merged)?;
        self.ensure_room_available(&details, Some(reference)).await?;

        let updated = self
            .guarded(
                "update_details_if_unchanged",
                self.store.update_details_if_unchanged(
                    reference,
                    &details,
                    current.status,
                    current.updated_at,
                ),
            )
            .await?;

        match updated {
            Some(booking) => {
                tracing::info!(
                    reference = %booking.reference,
                    nights = booking.details.nights,
                    "Booking updated",
                );
                Ok(booking)
            }
            None => {
                let latest = self.load(reference).await?;
                tracing::warn!(
                    %reference,
                    expected_status = %current.status,
                    actual_status = %latest.status,
                    expected_updated_at = %current.updated_at,
                    actual_updated_at = %latest.updated_at,
                    "Booking changed while being updated",
                );
                if latest.status.is_terminal() {
                    Err(CoreError::ImmutableRecord {
                        reference: latest.reference,
                        status: latest.status,
                    })
                } else {
                    Err(CoreError::Conflict(format!(
                        "Booking {reference} was modified concurrently; reload and retry"
                    )))
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Move a booking through its status lifecycle.
    ///
    /// The write is a compare-and-swap on the status that was read; losing
    /// a race reports the outcome against the status that actually won.
    pub async fn transition_booking(
        &self,
        reference: &str,
        action: BookingAction,
    ) -> Result<Booking, CoreError> {
        let current = self.load(reference).await?;
        let next = current
            .status
            .apply(action, reference)
            .inspect_err(|_| {
                tracing::warn!(
                    %reference,
                    from = %current.status,
                    %action,
                    "Rejected booking transition",
                );
            })?;

        let swapped = self
            .guarded(
                "set_status_if",
                self.store.set_status_if(reference, current.status, next),
            )
            .await?;

        if let Some(booking) = swapped {
            tracing::info!(
                %reference,
                from = %current.status,
                to = %booking.status,
                "Booking status changed",
            );
            return Ok(booking);
        }

        let latest = self.load(reference).await?;
        tracing::warn!(
            %reference,
            expected = %current.status,
            actual = %latest.status,
            %action,
            "Booking status changed concurrently",
        );
        latest.status.apply(action, reference)?;
        Err(CoreError::Conflict(format!(
            "Booking {reference} changed to {} while trying to {action}",
            latest.status
        )))
    }

    /// `pending -> confirmed`.
    pub async fn confirm(&self, reference: &str) -> Result<Booking, CoreError> {
        self.transition_booking(reference, BookingAction::Confirm)
            .await
    }

    /// `pending | confirmed -> cancelled`.
    pub async fn cancel(&self, reference: &str) -> Result<Booking, CoreError> {
        self.transition_booking(reference, BookingAction::Cancel)
            .await
    }

    /// `confirmed -> completed`.
    pub async fn complete(&self, reference: &str) -> Result<Booking, CoreError> {
        self.transition_booking(reference, BookingAction::Complete)
            .await
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn get_booking(&self, reference: &str) -> Result<Booking, CoreError> {
        self.load(reference).await
    }

    pub async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, CoreError> {
        self.guarded("list", self.store.list(filter)).await
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn load(&self, reference: &str) -> Result<Booking, CoreError> {
        let not_found = || CoreError::NotFound {
            entity: "Booking",
            reference: reference.to_string(),
        };
        if !is_valid_reference(reference) {
            return Err(not_found());
        }
        self.guarded("find_one", self.store.find_one(reference))
            .await?
            .ok_or_else(not_found)
    }

    async fn ensure_room_available(
        &self,
        details: &BookingDetails,
        exclude_reference: Option<&str>,
    ) -> Result<(), CoreError> {
        let overlapping = self
            .guarded(
                "find_overlapping",
                self.store.find_overlapping(
                    &details.room_number,
                    details.check_in,
                    details.check_out,
                    exclude_reference,
                ),
            )
            .await?;

        match overlapping.into_iter().next() {
            None => Ok(()),
            Some(conflict) => {
                tracing::info!(
                    room_number = %details.room_number,
                    conflicting_reference = %conflict.reference,
                    "Room unavailable for requested stay",
                );
                Err(CoreError::RoomUnavailable {
                    room_number: details.room_number.clone(),
                    conflicting_reference: conflict.reference,
                })
            }
        }
    }

    /// Run a store call under the configured timeout.
    async fn guarded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, CoreError>>,
    ) -> Result<T, CoreError> {
        match tokio::time::timeout(self.config.storage_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = self.config.storage_timeout.as_millis() as u64;
                tracing::warn!(operation, timeout_ms, "Storage call timed out");
                Err(CoreError::StorageUnavailable(format!(
                    "{operation} did not complete within {timeout_ms}ms"
                )))
            }
        }
    }
}
