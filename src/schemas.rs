use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::UnprocessableEntity(format!("Validation failed: {errors}")))
}

pub fn clamp_limit_in_range(limit: i64, minimum: i64, maximum: i64) -> i64 {
    limit.clamp(minimum, maximum)
}

pub fn serialize_to_map<T>(value: &T) -> serde_json::Map<String, serde_json::Value>
where
    T: serde::Serialize,
{
    let json = serde_json::to_value(value)
        .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()));
    json.as_object().cloned().unwrap_or_default()
}

pub fn remove_nulls(
    mut map: serde_json::Map<String, serde_json::Value>,
) -> serde_json::Map<String, serde_json::Value> {
    map.retain(|_, value| !value.is_null());
    map
}

fn default_booking_type() -> String {
    "commercial".to_string()
}

fn default_limit_100() -> i64 {
    100
}

fn default_offset() -> i64 {
    0
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct PropertyPath {
    pub property_id: String,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct BookingPath {
    pub booking_id: String,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct PublicPropertyPath {
    pub tenant_slug: String,
    pub property_id: String,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct AvailabilityQuery {
    pub tenant_id: String,
    pub check_in: String,
    pub check_out: String,
    pub exclude_booking_id: Option<String>,
    pub booking_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct ValidateAvailabilityInput {
    #[validate(length(min = 1, max = 64))]
    pub tenant_id: String,
    pub check_in: String,
    pub check_out: String,
    pub exclude_booking_id: Option<String>,
    pub booking_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct CalendarQuery {
    pub tenant_id: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct PublicCalendarQuery {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct NextAvailableQuery {
    pub tenant_id: String,
    pub max_days: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct PublicNextAvailableQuery {
    pub max_days: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct BookingsQuery {
    pub tenant_id: String,
    pub property_id: Option<String>,
    pub booking_status_id: Option<String>,
    /// Only bookings that are still occupying a night on or after this date.
    pub from: Option<String>,
    /// Only bookings that start before this date.
    pub to: Option<String>,
    #[serde(default = "default_limit_100")]
    pub limit: i64,
    #[serde(default = "default_offset")]
    pub offset: i64,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct CreateBookingInput {
    #[validate(length(min = 1, max = 64))]
    pub tenant_id: String,
    #[validate(length(min = 1, max = 64))]
    pub property_id: String,
    pub check_in_date: String,
    pub check_out_date: String,
    #[serde(default = "default_booking_type")]
    pub booking_type: String,
    pub guest_person_id: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct UpdateBookingInput {
    pub check_in_date: Option<String>,
    pub check_out_date: Option<String>,
    pub guest_person_id: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl UpdateBookingInput {
    pub fn touches_dates(&self) -> bool {
        self.check_in_date.is_some() || self.check_out_date.is_some()
    }
}
