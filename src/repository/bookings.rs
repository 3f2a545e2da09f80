use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::repository::table_service::{get_row_opt, list_rows};
use crate::services::calendar::{BookingRecord, BookingRepository, GuestName, LookupValue};

const MAX_BOOKINGS_PER_QUERY: i64 = 5000;

/// Booking reads backed by Postgres.
#[derive(Clone)]
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn fetch_bookings_overlapping(
        &self,
        property_id: &str,
        tenant_id: &str,
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> AppResult<Vec<BookingRecord>> {
        let mut filters = Map::new();
        filters.insert("tenant_id".to_string(), Value::String(tenant_id.to_string()));
        filters.insert(
            "property_id".to_string(),
            Value::String(property_id.to_string()),
        );
        filters.insert(
            "check_in_date__lt".to_string(),
            Value::String(range_end.to_string()),
        );
        filters.insert(
            "check_out_date__gt".to_string(),
            Value::String(range_start.to_string()),
        );

        let rows = list_rows(
            &self.pool,
            "bookings",
            Some(&filters),
            MAX_BOOKINGS_PER_QUERY,
            0,
            "check_in_date",
            true,
        )
        .await?;
        if rows.len() as i64 >= MAX_BOOKINGS_PER_QUERY {
            tracing::warn!(
                property_id,
                tenant_id,
                %range_start,
                %range_end,
                "Booking window hit the row cap, results are truncated"
            );
        }

        rows.into_iter().map(decode_row).collect()
    }

    async fn fetch_booking_status(&self, status_id: &str) -> AppResult<Option<LookupValue>> {
        get_row_opt(&self.pool, "booking_statuses", status_id, "id")
            .await?
            .map(decode_row)
            .transpose()
    }

    async fn fetch_booking_type(&self, type_id: &str) -> AppResult<Option<LookupValue>> {
        get_row_opt(&self.pool, "booking_types", type_id, "id")
            .await?
            .map(decode_row)
            .transpose()
    }

    async fn fetch_guest_name(&self, person_id: &str) -> AppResult<Option<GuestName>> {
        get_row_opt(&self.pool, "persons", person_id, "id")
            .await?
            .map(decode_row)
            .transpose()
    }

    async fn fetch_property_min_nights(&self, property_id: &str) -> AppResult<Option<i64>> {
        let property = get_row_opt(&self.pool, "properties", property_id, "id").await?;
        Ok(property
            .as_ref()
            .and_then(|row| row.get("min_nights"))
            .and_then(Value::as_i64))
    }
}

/// Id of the lookup row whose `value` matches, e.g. the `cancelled` status.
pub async fn find_lookup_id(pool: &PgPool, table: &str, value: &str) -> AppResult<Option<String>> {
    let mut filters = Map::new();
    filters.insert("value".to_string(), Value::String(value.to_string()));
    let rows = list_rows(pool, table, Some(&filters), 1, 0, "value", true).await?;
    Ok(rows
        .first()
        .and_then(|row| row.get("id"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned))
}

/// Like [`find_lookup_id`], but a missing row is a configuration problem.
pub async fn require_lookup_id(pool: &PgPool, table: &str, value: &str) -> AppResult<String> {
    find_lookup_id(pool, table, value).await?.ok_or_else(|| {
        tracing::error!(table, value, "Lookup row is missing");
        AppError::Internal(format!("Missing '{value}' row in {table}."))
    })
}

fn decode_row<T: DeserializeOwned>(row: Value) -> AppResult<T> {
    serde_json::from_value(row).map_err(|error| {
        tracing::error!(error = %error, "Unexpected row shape");
        AppError::Internal("Could not read a stored record.".to_string())
    })
}
