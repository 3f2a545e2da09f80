use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::interval::ranges_overlap;
use super::model::{BookingRecord, GuestName, LookupValue};
use super::repository::BookingRepository;
use crate::error::{AppError, AppResult};

pub const TENANT: &str = "tenant-1";
pub const PROPERTY: &str = "property-1";
pub const STATUS_CONFIRMED: &str = "status-confirmed";
pub const STATUS_CANCELLED: &str = "status-cancelled";
pub const TYPE_COMMERCIAL: &str = "type-commercial";
pub const TYPE_CLOSED: &str = "type-closed";

/// In-memory repository used by the engine tests.
#[derive(Default)]
pub struct MemoryRepository {
    pub bookings: Vec<BookingRecord>,
    pub statuses: HashMap<String, String>,
    pub types: HashMap<String, String>,
    pub guests: HashMap<String, GuestName>,
    pub min_nights: HashMap<String, i64>,
    pub fail_bookings: bool,
    pub booking_queries: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        let mut repo = Self::default();
        repo.statuses
            .insert(STATUS_CONFIRMED.to_string(), "confirmed".to_string());
        repo.statuses
            .insert(STATUS_CANCELLED.to_string(), "cancelled".to_string());
        repo.types
            .insert(TYPE_COMMERCIAL.to_string(), "commercial".to_string());
        repo.types
            .insert(TYPE_CLOSED.to_string(), "closed_period".to_string());
        repo
    }

    pub fn with_min_nights(mut self, nights: i64) -> Self {
        self.min_nights.insert(PROPERTY.to_string(), nights);
        self
    }

    pub fn with_guest(mut self, person_id: &str, first: &str, last: &str) -> Self {
        self.guests.insert(
            person_id.to_string(),
            GuestName {
                first_name: Some(first.to_string()),
                last_name: Some(last.to_string()),
            },
        );
        self
    }

    pub fn with_booking(mut self, booking: BookingRecord) -> Self {
        self.bookings.push(booking);
        self
    }
}

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid test date")
}

pub fn booking(id: &str, check_in: &str, check_out: &str) -> BookingRecord {
    BookingRecord {
        id: id.to_string(),
        property_id: PROPERTY.to_string(),
        tenant_id: TENANT.to_string(),
        check_in_date: date(check_in),
        check_out_date: date(check_out),
        booking_status_id: Some(STATUS_CONFIRMED.to_string()),
        booking_type_id: Some(TYPE_COMMERCIAL.to_string()),
        guest_person_id: None,
        notes: None,
    }
}

#[async_trait]
impl BookingRepository for MemoryRepository {
    async fn fetch_bookings_overlapping(
        &self,
        property_id: &str,
        tenant_id: &str,
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> AppResult<Vec<BookingRecord>> {
        self.booking_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_bookings {
            return Err(AppError::Dependency("Database operation failed.".to_string()));
        }
        let mut rows = self
            .bookings
            .iter()
            .filter(|row| row.property_id == property_id && row.tenant_id == tenant_id)
            .filter(|row| {
                ranges_overlap(row.check_in_date, row.check_out_date, range_start, range_end)
            })
            .cloned()
            .collect::<Vec<_>>();
        rows.sort_by_key(|row| row.check_in_date);
        Ok(rows)
    }

    async fn fetch_booking_status(&self, status_id: &str) -> AppResult<Option<LookupValue>> {
        Ok(self.statuses.get(status_id).map(|value| LookupValue {
            value: value.clone(),
            label: None,
        }))
    }

    async fn fetch_booking_type(&self, type_id: &str) -> AppResult<Option<LookupValue>> {
        Ok(self.types.get(type_id).map(|value| LookupValue {
            value: value.clone(),
            label: None,
        }))
    }

    async fn fetch_guest_name(&self, person_id: &str) -> AppResult<Option<GuestName>> {
        Ok(self.guests.get(person_id).cloned())
    }

    async fn fetch_property_min_nights(&self, property_id: &str) -> AppResult<Option<i64>> {
        Ok(self.min_nights.get(property_id).copied())
    }
}
