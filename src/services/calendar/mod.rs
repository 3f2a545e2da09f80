//! Booking availability and calendar engine.
//!
//! Stateless: every call reads through a [`BookingRepository`] and keeps
//! nothing between calls.

mod availability;
mod dates;
mod days;
mod interval;
mod model;
mod periods;
mod repository;

#[cfg(test)]
mod memory;

pub use availability::{check_availability, validate_booking_availability};
pub use dates::{format_date_for_api, nights_between, parse_local_date, today_in};
pub use days::get_calendar_availability;
pub use model::{
    AvailabilityConflict, AvailabilityResult, Booking, BookingRecord, BookingStatus, BookingType,
    BookingValidation, CalendarDay, GuestName, LookupValue,
};
pub use periods::{get_next_available_periods, DEFAULT_SEARCH_DAYS};
pub use repository::BookingRepository;
