use chrono::NaiveDate;
use serde::Serialize;

/// Half-open day range `[start, end)`. The end day itself is free, which is
/// what lets a check-out and the next check-in share a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        ranges_overlap(self.start, self.end, other.start, other.end)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// `[a_start, a_end)` and `[b_start, b_end)` intersect.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Collapse ranges into disjoint occupied blocks. Touching ranges
/// (`[A, B)` and `[B, C)`) merge into one block.
pub fn merge_ranges(mut ranges: Vec<DateRange>) -> Vec<DateRange> {
    ranges.sort_by_key(|range| range.start);

    let mut merged: Vec<DateRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        if let Some(last) = merged.last_mut() {
            if range.start <= last.end {
                last.end = last.end.max(range.end);
                continue;
            }
        }
        merged.push(range);
    }
    merged
}
