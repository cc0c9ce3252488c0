// 📅 Cutoff Policy - which months of a year count as "active"
//
// Calendar-relative to an explicit reference date:
//   year before the reference year  → all 12 months
//   the reference year              → months strictly before the reference month
//   year after the reference year   → no months
//
// Months past the cutoff are absent from every sum, never zero-valued
// contributions. Pinning the reference date to 2025-09-08 yields the
// January-August window for 2025.

use chrono::{Datelike, Local, NaiveDate};

/// Number of months in a full year
pub const MONTHS_PER_YEAR: usize = 12;

/// Exclusive month-index bound for `year` as seen from `reference`
pub fn cutoff_month_index(year: i32, reference: NaiveDate) -> usize {
    match year.cmp(&reference.year()) {
        std::cmp::Ordering::Less => MONTHS_PER_YEAR,
        std::cmp::Ordering::Equal => reference.month0() as usize,
        std::cmp::Ordering::Greater => 0,
    }
}

/// Reference date used when none is configured
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Clamp a caller-supplied cutoff into `0..=12`
pub fn clamp(cutoff: usize) -> usize {
    cutoff.min(MONTHS_PER_YEAR)
}
