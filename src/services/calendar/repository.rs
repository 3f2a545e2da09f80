use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::model::{Booking, BookingRecord, BookingStatus, BookingType, GuestName, LookupValue};
use crate::error::AppResult;

/// Read access to bookings and their lookup rows. Every booking query is
/// scoped to one property inside one tenant.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Bookings whose `[check_in_date, check_out_date)` intersects
    /// `[range_start, range_end)`, ordered by check-in date.
    async fn fetch_bookings_overlapping(
        &self,
        property_id: &str,
        tenant_id: &str,
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> AppResult<Vec<BookingRecord>>;

    async fn fetch_booking_status(&self, status_id: &str) -> AppResult<Option<LookupValue>>;

    async fn fetch_booking_type(&self, type_id: &str) -> AppResult<Option<LookupValue>>;

    async fn fetch_guest_name(&self, person_id: &str) -> AppResult<Option<GuestName>>;

    async fn fetch_property_min_nights(&self, property_id: &str) -> AppResult<Option<i64>>;
}

pub(crate) async fn property_min_nights(
    repo: &dyn BookingRepository,
    property_id: &str,
) -> AppResult<i64> {
    Ok(repo
        .fetch_property_min_nights(property_id)
        .await?
        .filter(|nights| *nights > 0)
        .unwrap_or(1))
}

/// Resolve status and type ids into their enums. Lookups are memoised for
/// the duration of one call only.
pub(crate) async fn resolve_bookings(
    repo: &dyn BookingRepository,
    records: Vec<BookingRecord>,
) -> AppResult<Vec<Booking>> {
    let mut statuses: HashMap<String, Option<String>> = HashMap::new();
    let mut types: HashMap<String, Option<String>> = HashMap::new();
    let mut bookings = Vec::with_capacity(records.len());

    for record in records {
        let status_value = match record.booking_status_id.as_deref() {
            Some(status_id) => match statuses.get(status_id) {
                Some(cached) => cached.clone(),
                None => {
                    let value = repo
                        .fetch_booking_status(status_id)
                        .await?
                        .map(|lookup| lookup.value);
                    if value.is_none() {
                        tracing::warn!(
                            booking_id = %record.id,
                            status_id,
                            "Booking references a missing status, treating as active"
                        );
                    }
                    statuses.insert(status_id.to_string(), value.clone());
                    value
                }
            },
            None => None,
        };

        let booking_type_value = match record.booking_type_id.as_deref() {
            Some(type_id) => match types.get(type_id) {
                Some(cached) => cached.clone(),
                None => {
                    let value = repo
                        .fetch_booking_type(type_id)
                        .await?
                        .map(|lookup| lookup.value);
                    types.insert(type_id.to_string(), value.clone());
                    value
                }
            },
            None => None,
        };

        bookings.push(Booking {
            status: BookingStatus::from_lookup(status_value.as_deref()),
            booking_type: BookingType::from_lookup(booking_type_value.as_deref()),
            status_value,
            booking_type_value,
            id: record.id,
            property_id: record.property_id,
            tenant_id: record.tenant_id,
            check_in_date: record.check_in_date,
            check_out_date: record.check_out_date,
            guest_person_id: record.guest_person_id,
            notes: record.notes,
        });
    }

    Ok(bookings)
}

/// Guest display name for a commercial booking, if the person row exists.
pub(crate) async fn guest_display_name(
    repo: &dyn BookingRepository,
    booking: &Booking,
) -> AppResult<Option<String>> {
    let Some(person_id) = booking.guest_person_id.as_deref() else {
        return Ok(None);
    };
    Ok(repo
        .fetch_guest_name(person_id)
        .await?
        .and_then(|guest| guest.display_name()))
}
