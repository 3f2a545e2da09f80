use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::dates::add_days;
use super::model::{BookingType, CalendarDay};
use super::repository::{guest_display_name, resolve_bookings, BookingRepository};
use crate::error::AppResult;

struct ClaimedDay {
    booking_index: usize,
    is_check_in: bool,
}

/// Day-by-day occupancy for `[start, end]` (both ends included).
///
/// A day belongs to the first non-cancelled booking, in check-in order, whose
/// `[check_in, check_out)` covers it. Check-out days are never flagged.
pub async fn get_calendar_availability(
    repo: &dyn BookingRepository,
    property_id: &str,
    tenant_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Vec<CalendarDay>> {
    if end < start {
        return Ok(Vec::new());
    }

    let records = repo
        .fetch_bookings_overlapping(
            property_id,
            tenant_id,
            start,
            add_days(end, 1).unwrap_or(NaiveDate::MAX),
        )
        .await?;
    let bookings = resolve_bookings(repo, records)
        .await?
        .into_iter()
        .filter(|booking| !booking.status.is_cancelled())
        .collect::<Vec<_>>();

    let mut claimed: BTreeMap<NaiveDate, ClaimedDay> = BTreeMap::new();
    for (booking_index, booking) in bookings.iter().enumerate() {
        let mut day = booking.check_in_date.max(start);
        while day < booking.check_out_date && day <= end {
            let previous = claimed.get(&day).map(|existing| existing.booking_index);
            match previous {
                Some(winner) => {
                    tracing::warn!(
                        property_id,
                        date = %day,
                        kept = %bookings[winner].id,
                        ignored = %booking.id,
                        "Two bookings claim the same day"
                    );
                }
                None => {
                    claimed.insert(
                        day,
                        ClaimedDay {
                            booking_index,
                            is_check_in: day == booking.check_in_date,
                        },
                    );
                }
            }
            match add_days(day, 1) {
                Some(next) => day = next,
                None => break,
            }
        }
    }

    let mut guest_names: Vec<Option<String>> = vec![None; bookings.len()];
    for (index, booking) in bookings.iter().enumerate() {
        let used = claimed.values().any(|slot| slot.booking_index == index);
        if used && booking.booking_type == BookingType::Commercial {
            guest_names[index] = guest_display_name(repo, booking).await?;
        }
    }

    let mut days = Vec::new();
    let mut day = start;
    while day <= end {
        let entry = match claimed.get(&day) {
            Some(slot) => {
                let booking = &bookings[slot.booking_index];
                CalendarDay {
                    date: day,
                    is_available: false,
                    booking: Some(booking.clone()),
                    booking_type: Some(booking.booking_type),
                    is_check_in: slot.is_check_in,
                    is_check_out: false,
                    guest_name: guest_names[slot.booking_index].clone(),
                }
            }
            None => CalendarDay {
                date: day,
                is_available: true,
                booking: None,
                booking_type: None,
                is_check_in: false,
                is_check_out: false,
                guest_name: None,
            },
        };
        days.push(entry);
        match add_days(day, 1) {
            Some(next) => day = next,
            None => break,
        }
    }

    tracing::debug!(
        property_id,
        tenant_id,
        days = days.len(),
        occupied = claimed.len(),
        "Calendar materialized"
    );
    Ok(days)
}
