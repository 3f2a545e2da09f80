use chrono::NaiveDate;

use super::dates::add_days;
use super::interval::{merge_ranges, DateRange};
use super::model::AvailablePeriod;
use super::repository::{property_min_nights, BookingRepository};
use crate::error::AppResult;

pub const MAX_SUGGESTED_PERIODS: usize = 4;
pub const DEFAULT_SEARCH_DAYS: i64 = 365;

/// Up to four upcoming free windows of exactly the property's minimum stay,
/// searching from `today` through `today + max_days_to_search`.
///
/// Every stored booking blocks its dates here, whatever its status.
pub async fn get_next_available_periods(
    repo: &dyn BookingRepository,
    property_id: &str,
    tenant_id: &str,
    today: NaiveDate,
    max_days_to_search: i64,
) -> AppResult<Vec<AvailablePeriod>> {
    let min_nights = property_min_nights(repo, property_id).await?;
    let horizon = add_days(today, max_days_to_search.max(0)).unwrap_or(NaiveDate::MAX);
    let window_end = add_days(horizon, 1).unwrap_or(NaiveDate::MAX);

    let records = repo
        .fetch_bookings_overlapping(property_id, tenant_id, today, window_end)
        .await?;
    let occupied = records
        .iter()
        .map(|record| DateRange::new(record.check_in_date, record.check_out_date))
        .filter(|range| !range.is_empty())
        .collect::<Vec<_>>();
    let blocks = merge_ranges(occupied);

    let periods =
        find_available_periods(&blocks, today, horizon, min_nights, MAX_SUGGESTED_PERIODS);
    tracing::debug!(
        property_id,
        tenant_id,
        min_nights,
        blocks = blocks.len(),
        periods = periods.len(),
        "Next available periods computed"
    );
    Ok(periods)
}

/// Greedy forward scan over merged, sorted `blocks`. Each emitted window is
/// `min_nights` long even when the surrounding gap is wider; the scan then
/// continues from that window's check-out. No window ends after `horizon`.
pub fn find_available_periods(
    blocks: &[DateRange],
    today: NaiveDate,
    horizon: NaiveDate,
    min_nights: i64,
    limit: usize,
) -> Vec<AvailablePeriod> {
    let nights = min_nights.max(1);
    let mut periods = Vec::new();
    let mut cursor = today;
    let mut next_block = 0;

    while periods.len() < limit && cursor < horizon {
        while next_block < blocks.len() && blocks[next_block].end <= cursor {
            next_block += 1;
        }

        let Some(candidate_end) = add_days(cursor, nights).filter(|end| *end <= horizon) else {
            break;
        };
        let candidate = DateRange::new(cursor, candidate_end);
        if let Some(block) = blocks.get(next_block) {
            if block.overlaps(&candidate) {
                cursor = block.end;
                continue;
            }
        }

        periods.push(AvailablePeriod {
            check_in: candidate.start,
            check_out: candidate.end,
            nights,
        });
        cursor = candidate.end;
    }

    periods
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{find_available_periods, get_next_available_periods, DEFAULT_SEARCH_DAYS};
    use crate::services::calendar::interval::{ranges_overlap, DateRange};
    use crate::services::calendar::memory::{
        booking, date, MemoryRepository, PROPERTY, STATUS_CANCELLED, TENANT,
    };
    use crate::services::calendar::model::AvailablePeriod;

    fn pairs(periods: &[AvailablePeriod]) -> Vec<(String, String)> {
        periods
            .iter()
            .map(|period| (period.check_in.to_string(), period.check_out.to_string()))
            .collect()
    }

    fn owned(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(start, end)| (start.to_string(), end.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn fits_windows_before_and_after_a_booking() {
        let repo = MemoryRepository::new()
            .with_min_nights(2)
            .with_booking(booking("b1", "2025-07-01", "2025-07-10"));

        let periods = get_next_available_periods(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-06-25"),
            DEFAULT_SEARCH_DAYS,
        )
        .await
        .expect("search succeeds");

        assert_eq!(
            pairs(&periods),
            owned(&[
                ("2025-06-25", "2025-06-27"),
                ("2025-06-27", "2025-06-29"),
                ("2025-06-29", "2025-07-01"),
                ("2025-07-10", "2025-07-12"),
            ])
        );
        assert!(periods.iter().all(|period| period.nights == 2));
        assert!(periods.iter().all(|period| !ranges_overlap(
            period.check_in,
            period.check_out,
            date("2025-07-01"),
            date("2025-07-10")
        )));
    }

    #[tokio::test]
    async fn touching_bookings_form_one_block() {
        let repo = MemoryRepository::new()
            .with_min_nights(2)
            .with_booking(booking("b1", "2025-07-01", "2025-07-05"))
            .with_booking(booking("b2", "2025-07-05", "2025-07-08"));

        let periods = get_next_available_periods(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-07-01"),
            DEFAULT_SEARCH_DAYS,
        )
        .await
        .expect("search succeeds");
        assert_eq!(periods[0].check_in, date("2025-07-08"));
        assert_eq!(periods[0].check_out, date("2025-07-10"));
    }

    #[tokio::test]
    async fn gaps_shorter_than_minimum_are_skipped() {
        let repo = MemoryRepository::new()
            .with_min_nights(2)
            .with_booking(booking("b1", "2025-07-01", "2025-07-05"))
            .with_booking(booking("b2", "2025-07-06", "2025-07-10"));

        let periods = get_next_available_periods(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-07-01"),
            DEFAULT_SEARCH_DAYS,
        )
        .await
        .expect("search succeeds");
        assert_eq!(periods[0].check_in, date("2025-07-10"));
    }

    #[tokio::test]
    async fn cancelled_bookings_still_block_suggestions() {
        let mut record = booking("b1", "2025-07-01", "2025-07-03");
        record.booking_status_id = Some(STATUS_CANCELLED.to_string());
        let repo = MemoryRepository::new().with_booking(record);

        let periods = get_next_available_periods(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-07-01"),
            DEFAULT_SEARCH_DAYS,
        )
        .await
        .expect("search succeeds");
        assert_eq!(periods[0].check_in, date("2025-07-03"));
    }

    #[tokio::test]
    async fn defaults_to_one_night_and_caps_at_four() {
        let repo = MemoryRepository::new();

        let periods = get_next_available_periods(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-01-30"),
            DEFAULT_SEARCH_DAYS,
        )
        .await
        .expect("search succeeds");
        assert_eq!(
            pairs(&periods),
            owned(&[
                ("2025-01-30", "2025-01-31"),
                ("2025-01-31", "2025-02-01"),
                ("2025-02-01", "2025-02-02"),
                ("2025-02-02", "2025-02-03"),
            ])
        );
    }

    #[test]
    fn stops_at_the_search_horizon() {
        let periods = find_available_periods(&[], date("2025-06-01"), date("2025-06-06"), 3, 4);
        assert_eq!(pairs(&periods), owned(&[("2025-06-01", "2025-06-04")]));

        let blocked = [DateRange::new(date("2025-06-02"), date("2025-06-30"))];
        let none = find_available_periods(&blocked, date("2025-06-01"), date("2025-06-20"), 2, 4);
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn oversized_minimum_stay_yields_no_periods() {
        let repo = MemoryRepository::new()
            .with_min_nights(1_000_000_000)
            .with_booking(booking("b1", "2025-06-10", "2025-06-12"));

        let periods = get_next_available_periods(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-06-01"),
            DEFAULT_SEARCH_DAYS,
        )
        .await
        .expect("search succeeds");
        assert!(periods.is_empty());

        let near_end = find_available_periods(
            &[],
            NaiveDate::MAX.pred_opt().expect("previous day exists"),
            NaiveDate::MAX,
            i64::MAX,
            4,
        );
        assert!(near_end.is_empty());
    }

    #[test]
    fn cursor_inside_a_block_jumps_to_its_end() {
        let blocks = [DateRange::new(date("2025-05-20"), date("2025-06-03"))];
        let periods = find_available_periods(&blocks, date("2025-06-01"), date("2025-07-01"), 1, 1);
        assert_eq!(pairs(&periods), owned(&[("2025-06-03", "2025-06-04")]));
    }
}
