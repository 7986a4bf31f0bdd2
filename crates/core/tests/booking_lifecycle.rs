//! Lifecycle tests for `BookingManager` over the in-memory store.
//!
//! Covers creation (derived nights, references), the status machine,
//! the update path, room availability, concurrency, and storage failures.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::{json, Value};

use hostel_core::booking::{parse_timestamp, Booking, BookingDetails, BookingPayload};
use hostel_core::error::CoreError;
use hostel_core::manager::{BookingConfig, BookingManager};
use hostel_core::reference::is_valid_reference;
use hostel_core::search::BookingFilter;
use hostel_core::status::{BookingAction, BookingStatus};
use hostel_core::store::{BookingStore, InMemoryBookingStore};
use hostel_core::types::Timestamp;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn manager() -> BookingManager<InMemoryBookingStore> {
    BookingManager::new(InMemoryBookingStore::new(), BookingConfig::default())
}

fn payload(value: Value) -> BookingPayload {
    serde_json::from_value(value).unwrap()
}

fn stay(room: &str, check_in: &str, check_out: &str) -> BookingPayload {
    payload(json!({
        "guest_name": "Ada Lovelace",
        "guest_email": "ada@example.com",
        "room_number": room,
        "check_in": check_in,
        "check_out": check_out,
        "amount": 150000,
    }))
}

async fn create(mgr: &BookingManager<InMemoryBookingStore>, room: &str) -> Booking {
    mgr.create_booking(&stay(room, "2024-03-01", "2024-03-04"))
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_persists_pending_booking_with_derived_nights() {
    let mgr = manager();
    let booking = create(&mgr, "12").await;

    assert_eq!(booking.details.nights, 3);
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.details.amount, 150000.0);
    assert!(is_valid_reference(&booking.reference), "{}", booking.reference);

    let stored = mgr.get_booking(&booking.reference).await.unwrap();
    assert_eq!(stored, booking);
}

#[tokio::test]
async fn create_derives_nights_with_ceiling() {
    let mgr = manager();
    let exact = mgr
        .create_booking(&stay("1", "2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z"))
        .await
        .unwrap();
    assert_eq!(exact.details.nights, 1);

    let over = mgr
        .create_booking(&stay("2", "2024-01-01T00:00:00Z", "2024-01-02T01:00:00Z"))
        .await
        .unwrap();
    assert_eq!(over.details.nights, 2);

    let short = mgr
        .create_booking(&stay("3", "2024-01-01T00:00:00Z", "2024-01-01T23:00:00Z"))
        .await
        .unwrap();
    assert_eq!(short.details.nights, 1);
}

#[tokio::test]
async fn create_rejects_check_out_not_after_check_in() {
    let mgr = manager();
    for check_out in ["2024-03-01", "2024-02-28"] {
        let err = mgr
            .create_booking(&stay("1", "2024-03-01", check_out))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::TemporalOrder { .. });
    }
    assert!(mgr.store().is_empty().await);
}

#[tokio::test]
async fn create_rejects_client_supplied_reference_or_status() {
    let mgr = manager();

    let mut raw = stay("1", "2024-03-01", "2024-03-04");
    raw.reference = Some(json!("BK-MINE"));
    assert_matches!(
        mgr.create_booking(&raw).await,
        Err(CoreError::Validation { field: "reference", .. })
    );

    let mut raw = stay("1", "2024-03-01", "2024-03-04");
    raw.status = Some(json!("confirmed"));
    assert_matches!(
        mgr.create_booking(&raw).await,
        Err(CoreError::Validation { field: "status", .. })
    );

    let mut raw = stay("1", "2024-03-01", "2024-03-04");
    raw.status = Some(json!("pending"));
    assert!(mgr.create_booking(&raw).await.is_ok());
}

#[tokio::test]
async fn create_accepts_padded_pending_status() {
    let mgr = manager();
    let mut raw = stay("1", "2024-03-01", "2024-03-04");
    raw.status = Some(json!(" pending "));

    let booking = mgr.create_booking(&raw).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creations_get_distinct_references() {
    let mgr = Arc::new(manager());

    let handles: Vec<_> = (0..1_000)
        .map(|i| {
            let mgr = Arc::clone(&mgr);
            tokio::spawn(async move {
                mgr.create_booking(&stay(&format!("R{i}"), "2024-05-01", "2024-05-03"))
                    .await
            })
        })
        .collect();

    let mut references = std::collections::HashSet::new();
    for result in futures::future::join_all(handles).await {
        let booking = result.unwrap().unwrap();
        assert!(!booking.reference.is_empty());
        references.insert(booking.reference);
    }

    assert_eq!(references.len(), 1_000);
    assert_eq!(mgr.store().len().await, 1_000);
}

// ---------------------------------------------------------------------------
// Status lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancelled_booking_cannot_be_confirmed_again() {
    let mgr = manager();
    let booking = create(&mgr, "1").await;

    mgr.confirm(&booking.reference).await.unwrap();
    let cancelled = mgr.cancel(&booking.reference).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let err = mgr.confirm(&booking.reference).await.unwrap_err();
    assert_matches!(
        err,
        CoreError::IllegalTransition {
            from: BookingStatus::Cancelled,
            action: BookingAction::Confirm,
            ..
        }
    );
}

#[tokio::test]
async fn pending_booking_cannot_be_completed() {
    let mgr = manager();
    let booking = create(&mgr, "1").await;

    let err = mgr.complete(&booking.reference).await.unwrap_err();
    assert_matches!(
        err,
        CoreError::IllegalTransition {
            from: BookingStatus::Pending,
            action: BookingAction::Complete,
            ..
        }
    );
    assert_eq!(
        mgr.get_booking(&booking.reference).await.unwrap().status,
        BookingStatus::Pending
    );
}

#[tokio::test]
async fn full_lifecycle_reaches_completed_without_touching_stay_fields() {
    let mgr = manager();
    let booking = create(&mgr, "1").await;

    let confirmed = mgr
        .transition_booking(&booking.reference, BookingAction::Confirm)
        .await
        .unwrap();
    let completed = mgr
        .transition_booking(&booking.reference, BookingAction::Complete)
        .await
        .unwrap();

    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert_eq!(completed.status, BookingStatus::Completed);
    assert_eq!(completed.reference, booking.reference);
    assert_eq!(completed.details, booking.details);
    assert!(completed.updated_at >= booking.updated_at);
    assert_eq!(completed.created_at, booking.created_at);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_complete_and_cancel_never_both_succeed() {
    let mgr = Arc::new(manager());

    for i in 0..50 {
        let booking = mgr
            .create_booking(&stay(&format!("race-{i}"), "2024-06-01", "2024-06-02"))
            .await
            .unwrap();
        mgr.confirm(&booking.reference).await.unwrap();

        let complete = {
            let mgr = Arc::clone(&mgr);
            let reference = booking.reference.clone();
            tokio::spawn(async move { mgr.complete(&reference).await })
        };
        let cancel = {
            let mgr = Arc::clone(&mgr);
            let reference = booking.reference.clone();
            tokio::spawn(async move { mgr.cancel(&reference).await })
        };

        let completed = complete.await.unwrap();
        let cancelled = cancel.await.unwrap();
        let wins = usize::from(completed.is_ok()) + usize::from(cancelled.is_ok());
        assert_eq!(wins, 1, "complete: {completed:?}, cancel: {cancelled:?}");

        let stored = mgr.get_booking(&booking.reference).await.unwrap();
        let expected = if completed.is_ok() {
            BookingStatus::Completed
        } else {
            BookingStatus::Cancelled
        };
        assert_eq!(stored.status, expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_confirms_succeed_exactly_once() {
    let mgr = Arc::new(manager());
    let booking = create(&mgr, "1").await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let mgr = Arc::clone(&mgr);
            let reference = booking.reference.clone();
            tokio::spawn(async move { mgr.confirm(&reference).await })
        })
        .collect();

    let mut wins = 0;
    for result in futures::future::join_all(handles).await {
        match result.unwrap() {
            Ok(_) => wins += 1,
            Err(err) => assert_matches!(
                err,
                CoreError::IllegalTransition { .. } | CoreError::Conflict(_)
            ),
        }
    }
    assert_eq!(wins, 1);
}

// ---------------------------------------------------------------------------
// Update path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_rederives_nights() {
    let mgr = manager();
    let booking = create(&mgr, "1").await;

    let updated = mgr
        .update_booking(
            &booking.reference,
            &payload(json!({ "check_out": "2024-03-08", "nights": 1 })),
        )
        .await
        .unwrap();

    assert_eq!(updated.details.nights, 7);
    assert_eq!(updated.reference, booking.reference);
    assert_eq!(updated.status, BookingStatus::Pending);
}

#[tokio::test]
async fn update_on_confirmed_booking_is_allowed() {
    let mgr = manager();
    let booking = create(&mgr, "1").await;
    mgr.confirm(&booking.reference).await.unwrap();

    let updated = mgr
        .update_booking(&booking.reference, &payload(json!({ "notes": " late arrival " })))
        .await
        .unwrap();
    assert_eq!(updated.details.notes.as_deref(), Some("late arrival"));
    assert_eq!(updated.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn update_on_completed_booking_is_rejected_and_record_unchanged() {
    let mgr = manager();
    let booking = create(&mgr, "1").await;
    mgr.confirm(&booking.reference).await.unwrap();
    let completed = mgr.complete(&booking.reference).await.unwrap();

    let err = mgr
        .update_booking(&booking.reference, &payload(json!({ "amount": 1 })))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        CoreError::ImmutableRecord {
            status: BookingStatus::Completed,
            ..
        }
    );

    let stored = mgr.get_booking(&booking.reference).await.unwrap();
    assert_eq!(stored, completed);
}

#[tokio::test]
async fn update_on_cancelled_booking_is_rejected() {
    let mgr = manager();
    let booking = create(&mgr, "1").await;
    mgr.cancel(&booking.reference).await.unwrap();

    assert_matches!(
        mgr.update_booking(&booking.reference, &payload(json!({ "notes": "x" })))
            .await,
        Err(CoreError::ImmutableRecord {
            status: BookingStatus::Cancelled,
            ..
        })
    );
}

#[tokio::test]
async fn update_rejects_reference_edit_and_invalid_dates() {
    let mgr = manager();
    let booking = create(&mgr, "1").await;

    assert_matches!(
        mgr.update_booking(&booking.reference, &payload(json!({ "reference": "BK-NEW" })))
            .await,
        Err(CoreError::Validation { field: "reference", .. })
    );
    assert_matches!(
        mgr.update_booking(&booking.reference, &payload(json!({ "check_out": "2024-02-01" })))
            .await,
        Err(CoreError::TemporalOrder { .. })
    );

    let stored = mgr.get_booking(&booking.reference).await.unwrap();
    assert_eq!(stored, booking);
}

#[tokio::test]
async fn unknown_or_malformed_reference_is_not_found() {
    let mgr = manager();
    assert_matches!(
        mgr.get_booking("BK-DOESNOTEXIST").await,
        Err(CoreError::NotFound { entity: "Booking", .. })
    );
    assert_matches!(
        mgr.confirm("not a reference").await,
        Err(CoreError::NotFound { .. })
    );
}

// ---------------------------------------------------------------------------
// Room availability
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overlapping_stay_in_same_room_is_rejected() {
    let mgr = manager();
    let first = create(&mgr, "7").await;

    let err = mgr
        .create_booking(&stay("7", "2024-03-03", "2024-03-05"))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        CoreError::RoomUnavailable { ref conflicting_reference, .. }
            if *conflicting_reference == first.reference
    );

    // Other rooms and back-to-back stays are fine.
    mgr.create_booking(&stay("8", "2024-03-03", "2024-03-05"))
        .await
        .unwrap();
    mgr.create_booking(&stay("7", "2024-03-04", "2024-03-06"))
        .await
        .unwrap();
}

#[tokio::test]
async fn cancelling_frees_the_room() {
    let mgr = manager();
    let first = create(&mgr, "7").await;
    mgr.cancel(&first.reference).await.unwrap();

    let second = create(&mgr, "7").await;
    assert_ne!(second.reference, first.reference);
}

#[tokio::test]
async fn moving_dates_onto_another_stay_is_rejected() {
    let mgr = manager();
    create(&mgr, "7").await;
    let later = mgr
        .create_booking(&stay("7", "2024-03-10", "2024-03-12"))
        .await
        .unwrap();

    assert_matches!(
        mgr.update_booking(&later.reference, &payload(json!({ "check_in": "2024-03-02" })))
            .await,
        Err(CoreError::RoomUnavailable { .. })
    );
    // Extending within its own window is fine.
    let extended = mgr
        .update_booking(&later.reference, &payload(json!({ "check_out": "2024-03-14" })))
        .await
        .unwrap();
    assert_eq!(extended.details.nights, 4);
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_filters_by_status_and_room() {
    let mgr = manager();
    let a = create(&mgr, "1").await;
    create(&mgr, "2").await;
    mgr.confirm(&a.reference).await.unwrap();

    let confirmed = mgr
        .list_bookings(&BookingFilter::new(
            Some(BookingStatus::Confirmed),
            None,
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].reference, a.reference);

    let room_two = mgr
        .list_bookings(&BookingFilter::new(None, Some("2".into()), None, None))
        .await
        .unwrap();
    assert_eq!(room_two.len(), 1);
}

// ---------------------------------------------------------------------------
// Storage failures
// ---------------------------------------------------------------------------

/// In-memory store with injectable faults.
#[derive(Default)]
struct FaultyStore {
    inner: InMemoryBookingStore,
    /// Added before every call.
    delay: Duration,
    /// Added after `find_one` has read, so the caller acts on a stale copy.
    read_lag: Duration,
    all_references_taken: bool,
    /// Inserts still to be rejected as if another writer took the reference.
    lost_insert_races: AtomicU32,
    inserts_attempted: AtomicU32,
}

impl FaultyStore {
    fn losing_insert_races(n: u32) -> Self {
        Self {
            lost_insert_races: AtomicU32::new(n),
            ..Self::default()
        }
    }
}

impl BookingStore for FaultyStore {
    async fn find_one(&self, reference: &str) -> Result<Option<Booking>, CoreError> {
        tokio::time::sleep(self.delay).await;
        let found = self.inner.find_one(reference).await;
        tokio::time::sleep(self.read_lag).await;
        found
    }

    async fn exists_reference(&self, reference: &str) -> Result<bool, CoreError> {
        tokio::time::sleep(self.delay).await;
        if self.all_references_taken {
            return Ok(true);
        }
        self.inner.exists_reference(reference).await
    }

    async fn insert(
        &self,
        reference: &str,
        details: &BookingDetails,
    ) -> Result<Booking, CoreError> {
        tokio::time::sleep(self.delay).await;
        self.inserts_attempted.fetch_add(1, Ordering::SeqCst);
        let lost = self
            .lost_insert_races
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lost {
            return Err(CoreError::DuplicateReference(reference.to_string()));
        }
        self.inner.insert(reference, details).await
    }

    async fn update_details_if_unchanged(
        &self,
        reference: &str,
        details: &BookingDetails,
        expected_status: BookingStatus,
        expected_updated_at: Timestamp,
    ) -> Result<Option<Booking>, CoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner
            .update_details_if_unchanged(reference, details, expected_status, expected_updated_at)
            .await
    }

    async fn set_status_if(
        &self,
        reference: &str,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<Option<Booking>, CoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.set_status_if(reference, expected, next).await
    }

    async fn find_overlapping(
        &self,
        room_number: &str,
        check_in: Timestamp,
        check_out: Timestamp,
        exclude_reference: Option<&str>,
    ) -> Result<Vec<Booking>, CoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner
            .find_overlapping(room_number, check_in, check_out, exclude_reference)
            .await
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, CoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.list(filter).await
    }
}

#[tokio::test]
async fn slow_store_surfaces_storage_unavailable() {
    let mgr = BookingManager::new(
        FaultyStore {
            delay: Duration::from_millis(500),
            ..FaultyStore::default()
        },
        BookingConfig {
            storage_timeout: Duration::from_millis(20),
            ..BookingConfig::default()
        },
    );

    let err = mgr
        .create_booking(&stay("1", "2024-03-01", "2024-03-04"))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::StorageUnavailable(_));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unresolvable_reference_collision_fails_without_writing() {
    let mgr = BookingManager::new(
        FaultyStore {
            all_references_taken: true,
            ..FaultyStore::default()
        },
        BookingConfig {
            max_reference_attempts: 3,
            ..BookingConfig::default()
        },
    );

    let err = mgr
        .create_booking(&stay("1", "2024-03-01", "2024-03-04"))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::DuplicateReference(_));
    assert_eq!(mgr.store().inserts_attempted.load(Ordering::SeqCst), 0);
    assert!(mgr.store().inner.is_empty().await);
}

#[tokio::test]
async fn reference_lost_at_insert_is_retried_with_a_fresh_one() {
    let mgr = BookingManager::new(FaultyStore::losing_insert_races(2), BookingConfig::default());

    let booking = mgr
        .create_booking(&stay("1", "2024-03-01", "2024-03-04"))
        .await
        .unwrap();

    assert!(is_valid_reference(&booking.reference));
    assert_eq!(mgr.store().inserts_attempted.load(Ordering::SeqCst), 3);
    assert_eq!(mgr.store().inner.len().await, 1);
}

#[tokio::test]
async fn reference_lost_at_every_insert_fails_without_writing() {
    let mgr = BookingManager::new(
        FaultyStore::losing_insert_races(3),
        BookingConfig {
            max_reference_attempts: 3,
            ..BookingConfig::default()
        },
    );

    let err = mgr
        .create_booking(&stay("1", "2024-03-01", "2024-03-04"))
        .await
        .unwrap_err();

    assert_matches!(err, CoreError::DuplicateReference(_));
    assert_eq!(mgr.store().inserts_attempted.load(Ordering::SeqCst), 3);
    assert!(mgr.store().inner.is_empty().await);
}

#[tokio::test]
async fn concurrent_edits_never_lose_a_write() {
    let mgr = BookingManager::new(
        FaultyStore {
            read_lag: Duration::from_millis(50),
            ..FaultyStore::default()
        },
        BookingConfig::default(),
    );
    let booking = mgr
        .create_booking(&stay("1", "2024-03-01", "2024-03-04"))
        .await
        .unwrap();
    let reference = booking.reference.as_str();

    let amount = payload(json!({ "amount": 1 }));
    let notes = payload(json!({ "notes": "late" }));
    let (by_amount, by_notes) = tokio::join!(
        mgr.update_booking(reference, &amount),
        mgr.update_booking(reference, &notes),
    );

    let stored = mgr.get_booking(reference).await.unwrap();
    match (by_amount, by_notes) {
        (Ok(winner), Err(CoreError::Conflict(_))) => {
            assert_eq!(stored, winner);
            assert_eq!(stored.details.amount, 1.0);
            assert_eq!(stored.details.notes, None);
        }
        (Err(CoreError::Conflict(_)), Ok(winner)) => {
            assert_eq!(stored, winner);
            assert_eq!(stored.details.amount, 150000.0);
            assert_eq!(stored.details.notes.as_deref(), Some("late"));
        }
        other => panic!("expected exactly one edit to win, got {other:?}"),
    }
}

#[test]
fn parse_timestamp_is_exposed_for_callers() {
    let ts = parse_timestamp("2024-03-01").unwrap();
    assert_eq!(ts.to_rfc3339(), "2024-03-01T00:00:00+00:00");
}
