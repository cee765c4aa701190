pub mod buckets;
pub mod dateparse;

use crate::definitions::{Real, DAYS_PER_YEAR};
use time::{Date, Duration};

/// Whole-day difference `target - base`.
#[inline]
pub fn days_between(base: Date, target: Date) -> i64 {
    (target - base).whole_days()
}

/// Year fraction of a whole-day difference on the crate day-count base.
#[inline]
pub fn year_fraction(base: Date, target: Date) -> Real {
    days_between(base, target) as Real / DAYS_PER_YEAR
}

#[inline]
pub fn add_days(date: Date, days: i64) -> Date {
    date + Duration::days(days)
}
