use std::collections::HashMap;

use chrono::{TimeDelta, Utc};
use tokio::sync::RwLock;

use crate::availability::blocks_stay;
use crate::booking::{Booking, BookingDetails};
use crate::error::CoreError;
use crate::search::BookingFilter;
use crate::status::BookingStatus;
use crate::types::Timestamp;

use super::BookingStore;

/// Process-local booking store.
///
/// Every write runs under a single write lock, so inserts and conditional
/// writes are atomic, and room overlap is enforced at write time the same
/// way the PostgreSQL exclusion constraint does.
#[derive(Debug, Default)]
pub struct InMemoryBookingStore {
    records: RwLock<HashMap<String, Booking>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored bookings.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

/// The `updated_at` for a write: now, but always strictly after the
/// previous value at microsecond resolution, so a conditional write keyed
/// on the old value can never match again.
fn next_updated_at(previous: Timestamp) -> Timestamp {
    Utc::now().max(previous + TimeDelta::microseconds(1))
}

fn first_conflict(
    records: &HashMap<String, Booking>,
    details: &BookingDetails,
    exclude_reference: Option<&str>,
) -> Option<CoreError> {
    records
        .values()
        .find(|b| {
            blocks_stay(
                b,
                &details.room_number,
                details.check_in,
                details.check_out,
                exclude_reference,
            )
        })
        .map(|b| CoreError::RoomUnavailable {
            room_number: details.room_number.clone(),
            conflicting_reference: b.reference.clone(),
        })
}

impl BookingStore for InMemoryBookingStore {
    async fn find_one(&self, reference: &str) -> Result<Option<Booking>, CoreError> {
        Ok(self.records.read().await.get(reference).cloned())
    }

    async fn exists_reference(&self, reference: &str) -> Result<bool, CoreError> {
        Ok(self.records.read().await.contains_key(reference))
    }

    async fn insert(
        &self,
        reference: &str,
        details: &BookingDetails,
    ) -> Result<Booking, CoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(reference) {
            return Err(CoreError::DuplicateReference(reference.to_string()));
        }
        if let Some(conflict) = first_conflict(&records, details, None) {
            return Err(conflict);
        }

        let now = Utc::now();
        let booking = Booking {
            reference: reference.to_string(),
            status: BookingStatus::Pending,
            details: details.clone(),
            created_at: now,
            updated_at: now,
        };
        records.insert(reference.to_string(), booking.clone());
        Ok(booking)
    }

    async fn update_details_if_unchanged(
        &self,
        reference: &str,
        details: &BookingDetails,
        expected_status: BookingStatus,
        expected_updated_at: Timestamp,
    ) -> Result<Option<Booking>, CoreError> {
        let mut records = self.records.write().await;
        match records.get(reference) {
            Some(current)
                if current.status == expected_status
                    && current.updated_at == expected_updated_at => {}
            _ => return Ok(None),
        }
        if let Some(conflict) = first_conflict(&records, details, Some(reference)) {
            return Err(conflict);
        }

        let Some(booking) = records.get_mut(reference) else {
            return Ok(None);
        };
        booking.details = details.clone();
        booking.updated_at = next_updated_at(booking.updated_at);
        Ok(Some(booking.clone()))
    }

    async fn set_status_if(
        &self,
        reference: &str,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<Option<Booking>, CoreError> {
        let mut records = self.records.write().await;
        match records.get_mut(reference) {
            Some(booking) if booking.status == expected => {
                booking.status = next;
                booking.updated_at = next_updated_at(booking.updated_at);
                Ok(Some(booking.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn find_overlapping(
        &self,
        room_number: &str,
        check_in: Timestamp,
        check_out: Timestamp,
        exclude_reference: Option<&str>,
    ) -> Result<Vec<Booking>, CoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|b| blocks_stay(b, room_number, check_in, check_out, exclude_reference))
            .cloned()
            .collect())
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, CoreError> {
        let records = self.records.read().await;
        let mut matching: Vec<Booking> = records
            .values()
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .filter(|b| {
                filter
                    .room_number
                    .as_deref()
                    .map_or(true, |r| b.details.room_number == r)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.reference.cmp(&a.reference))
        });

        Ok(matching
            .into_iter()
            .skip(usize::try_from(filter.offset).unwrap_or(0))
            .take(usize::try_from(filter.limit).unwrap_or(0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::booking::parse_timestamp;

    fn details(room: &str, check_in: &str, check_out: &str) -> BookingDetails {
        BookingDetails {
            guest_name: "Guest".to_string(),
            guest_email: None,
            guest_phone: None,
            room_number: room.to_string(),
            check_in: parse_timestamp(check_in).unwrap(),
            check_out: parse_timestamp(check_out).unwrap(),
            nights: 1,
            amount: 10.0,
            notes: None,
        }
    }

    #[tokio::test]
    async fn insert_refuses_existing_reference() {
        let store = InMemoryBookingStore::new();
        store
            .insert("BK-1", &details("1", "2024-01-01", "2024-01-02"))
            .await
            .unwrap();
        let err = store
            .insert("BK-1", &details("2", "2024-01-01", "2024-01-02"))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::DuplicateReference(r) if r == "BK-1");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn set_status_if_is_conditional() {
        let store = InMemoryBookingStore::new();
        store
            .insert("BK-1", &details("1", "2024-01-01", "2024-01-02"))
            .await
            .unwrap();

        let swapped = store
            .set_status_if("BK-1", BookingStatus::Pending, BookingStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(swapped.unwrap().status, BookingStatus::Confirmed);

        let missed = store
            .set_status_if("BK-1", BookingStatus::Pending, BookingStatus::Cancelled)
            .await
            .unwrap();
        assert!(missed.is_none());

        let missing = store
            .set_status_if("BK-404", BookingStatus::Pending, BookingStatus::Cancelled)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn overlap_is_enforced_on_write() {
        let store = InMemoryBookingStore::new();
        store
            .insert("BK-1", &details("1", "2024-01-01", "2024-01-05"))
            .await
            .unwrap();
        let err = store
            .insert("BK-2", &details("1", "2024-01-03", "2024-01-04"))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::RoomUnavailable { .. });

        // The booking being edited never conflicts with itself.
        let current = store.find_one("BK-1").await.unwrap().unwrap();
        let updated = store
            .update_details_if_unchanged(
                "BK-1",
                &details("1", "2024-01-02", "2024-01-06"),
                BookingStatus::Pending,
                current.updated_at,
            )
            .await
            .unwrap();
        assert!(updated.is_some());
    }

    #[tokio::test]
    async fn detail_write_misses_after_intervening_write() {
        let store = InMemoryBookingStore::new();
        let created = store
            .insert("BK-1", &details("1", "2024-01-01", "2024-01-02"))
            .await
            .unwrap();

        let first = store
            .update_details_if_unchanged(
                "BK-1",
                &details("1", "2024-01-01", "2024-01-03"),
                BookingStatus::Pending,
                created.updated_at,
            )
            .await
            .unwrap()
            .unwrap();
        assert!(first.updated_at > created.updated_at);

        // Same status, but keyed on the pre-edit timestamp.
        let stale = store
            .update_details_if_unchanged(
                "BK-1",
                &details("1", "2024-01-01", "2024-01-04"),
                BookingStatus::Pending,
                created.updated_at,
            )
            .await
            .unwrap();
        assert!(stale.is_none());

        let stored = store.find_one("BK-1").await.unwrap().unwrap();
        assert_eq!(stored.details, first.details);
    }

    #[test]
    fn updated_at_always_moves_forward() {
        let future = Utc::now() + TimeDelta::hours(1);
        assert!(next_updated_at(future) > future);
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let store = InMemoryBookingStore::new();
        for (i, room) in ["1", "2", "1"].iter().enumerate() {
            let start = format!("2024-02-{:02}", i * 3 + 1);
            let end = format!("2024-02-{:02}", i * 3 + 2);
            store
                .insert(&format!("BK-{i}"), &details(room, &start, &end))
                .await
                .unwrap();
        }
        store
            .set_status_if("BK-0", BookingStatus::Pending, BookingStatus::Cancelled)
            .await
            .unwrap();

        let room_one = store
            .list(&BookingFilter::new(None, Some("1".into()), None, None))
            .await
            .unwrap();
        assert_eq!(room_one.len(), 2);

        let pending = store
            .list(&BookingFilter::new(
                Some(BookingStatus::Pending),
                None,
                None,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);

        let page = store
            .list(&BookingFilter::new(None, None, Some(1), Some(1)))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
    }
}
