//! Calendar-date helpers shared by every part of the availability engine.
//!
//! Booking dates are plain calendar days. They are parsed into `NaiveDate`,
//! which carries no offset, so a `YYYY-MM-DD` value read from the wire can
//! never shift to the previous or next day the way a UTC-anchored timestamp
//! would.

use chrono::{Days, Local, NaiveDate, Utc};
use chrono_tz::Tz;

const API_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid date '{input}', expected YYYY-MM-DD.")]
pub struct DateParseError {
    pub input: String,
}

/// Parse a wire date. A trailing time part (`2025-06-10T00:00:00Z`) is
/// ignored; only the calendar day is kept. The day must be exactly
/// `YYYY-MM-DD`: no sign, no extra year digits, no unpadded fields.
pub fn parse_local_date(value: &str) -> Result<NaiveDate, DateParseError> {
    let trimmed = value.trim();
    let day_part = trimmed
        .split_once(|character: char| character == 'T' || character == ' ')
        .map_or(trimmed, |(day, _)| day);
    let invalid = || DateParseError {
        input: value.to_string(),
    };
    if !has_api_date_layout(day_part) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(day_part, API_DATE_FORMAT).map_err(|_| invalid())
}

fn has_api_date_layout(day_part: &str) -> bool {
    let bytes = day_part.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(index, byte)| match index {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        })
}

pub fn format_date_for_api(date: NaiveDate) -> String {
    date.format(API_DATE_FORMAT).to_string()
}

pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days()
}

/// `None` when the result falls outside the representable calendar.
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

/// Today's date in `tz`, or in the process local timezone when unset.
pub fn today_in(tz: Option<Tz>) -> NaiveDate {
    match tz {
        Some(tz) => Utc::now().with_timezone(&tz).date_naive(),
        None => Local::now().date_naive(),
    }
}

/// Accepts either a wire string or an already-parsed date.
pub trait IntoLocalDate {
    fn into_local_date(self) -> Result<NaiveDate, DateParseError>;
}

impl IntoLocalDate for NaiveDate {
    fn into_local_date(self) -> Result<NaiveDate, DateParseError> {
        Ok(self)
    }
}

impl IntoLocalDate for &str {
    fn into_local_date(self) -> Result<NaiveDate, DateParseError> {
        parse_local_date(self)
    }
}

impl IntoLocalDate for &String {
    fn into_local_date(self) -> Result<NaiveDate, DateParseError> {
        parse_local_date(self)
    }
}

impl IntoLocalDate for String {
    fn into_local_date(self) -> Result<NaiveDate, DateParseError> {
        parse_local_date(&self)
    }
}
