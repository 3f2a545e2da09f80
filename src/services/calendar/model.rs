use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_GUEST_NAME: &str = "Huésped desconocido";

/// Booking row as stored, with status and type still as lookup ids.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookingRecord {
    pub id: String,
    pub property_id: String,
    pub tenant_id: String,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    #[serde(default)]
    pub booking_status_id: Option<String>,
    #[serde(default)]
    pub booking_type_id: Option<String>,
    #[serde(default)]
    pub guest_person_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LookupValue {
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuestName {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl GuestName {
    pub fn display_name(&self) -> Option<String> {
        let parts = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Active,
    Cancelled,
}

impl BookingStatus {
    /// Only `"cancelled"` cancels. Unknown or missing statuses stay active.
    pub fn from_lookup(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("cancelled") => Self::Cancelled,
            _ => Self::Active,
        }
    }

    pub fn is_cancelled(self) -> bool {
        self == Self::Cancelled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingType {
    Commercial,
    ClosedPeriod,
}

impl BookingType {
    /// Stored types resolve leniently: anything but `"closed_period"` is a
    /// guest booking.
    pub fn from_lookup(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("closed_period") => Self::ClosedPeriod,
            _ => Self::Commercial,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Commercial => "commercial",
            Self::ClosedPeriod => "closed_period",
        }
    }
}

impl fmt::Display for BookingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown booking type '{0}', expected 'commercial' or 'closed_period'.")]
pub struct UnknownBookingType(pub String);

/// Caller-supplied types parse strictly.
impl FromStr for BookingType {
    type Err = UnknownBookingType;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "commercial" => Ok(Self::Commercial),
            "closed_period" => Ok(Self::ClosedPeriod),
            other => Err(UnknownBookingType(other.to_string())),
        }
    }
}

/// Booking with status and type resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Booking {
    pub id: String,
    pub property_id: String,
    pub tenant_id: String,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub status: BookingStatus,
    pub status_value: Option<String>,
    pub booking_type: BookingType,
    pub booking_type_value: Option<String>,
    pub guest_person_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityConflict {
    /// `None` for conflicts raised by request validation rather than by an
    /// existing booking.
    pub booking: Option<Booking>,
    pub conflict_type: BookingType,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityResult {
    pub available: bool,
    pub conflicts: Vec<AvailabilityConflict>,
}

impl AvailabilityResult {
    pub fn from_conflicts(conflicts: Vec<AvailabilityConflict>) -> Self {
        Self {
            available: conflicts.is_empty(),
            conflicts,
        }
    }

    pub fn rejected(conflict_type: BookingType, message: String) -> Self {
        Self::from_conflicts(vec![AvailabilityConflict {
            booking: None,
            conflict_type,
            message,
        }])
    }

    /// All conflict messages joined into one line.
    pub fn summary(&self) -> Option<String> {
        if self.conflicts.is_empty() {
            return None;
        }
        Some(
            self.conflicts
                .iter()
                .map(|conflict| conflict.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingValidation {
    pub valid: bool,
    pub message: Option<String>,
    pub conflicts: Vec<AvailabilityConflict>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_available: bool,
    pub booking: Option<Booking>,
    pub booking_type: Option<BookingType>,
    pub is_check_in: bool,
    pub is_check_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AvailablePeriod {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
}

#[cfg(test)]
mod tests {
    use super::{BookingStatus, BookingType, GuestName};

    #[test]
    fn only_cancelled_status_cancels() {
        assert_eq!(
            BookingStatus::from_lookup(Some("cancelled")),
            BookingStatus::Cancelled
        );
        assert_eq!(
            BookingStatus::from_lookup(Some("confirmed")),
            BookingStatus::Active
        );
        assert_eq!(BookingStatus::from_lookup(None), BookingStatus::Active);
    }

    #[test]
    fn stored_types_default_to_commercial() {
        assert_eq!(
            BookingType::from_lookup(Some("closed_period")),
            BookingType::ClosedPeriod
        );
        assert_eq!(
            BookingType::from_lookup(Some("owner_stay")),
            BookingType::Commercial
        );
        assert_eq!(BookingType::from_lookup(None), BookingType::Commercial);
    }

    #[test]
    fn requested_types_parse_strictly() {
        assert_eq!(
            "closed_period".parse::<BookingType>().ok(),
            Some(BookingType::ClosedPeriod)
        );
        assert!("owner_stay".parse::<BookingType>().is_err());
        assert_eq!(
            serde_json::to_value(BookingType::ClosedPeriod).ok(),
            Some(serde_json::json!("closed_period"))
        );
    }

    #[test]
    fn guest_display_name_skips_blank_parts() {
        let guest = GuestName {
            first_name: Some(" Ana ".to_string()),
            last_name: None,
        };
        assert_eq!(guest.display_name().as_deref(), Some("Ana"));
        let blank = GuestName {
            first_name: Some(String::new()),
            last_name: Some("  ".to_string()),
        };
        assert_eq!(blank.display_name(), None);
    }
}
