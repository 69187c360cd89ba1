use chrono::{DateTime, Days, FixedOffset, NaiveDate, TimeDelta, TimeZone};

use crate::error::ValidationError;
use crate::models::power::MAX_RANGE_DAYS;

pub const HOURS_PER_DAY: i64 = 24;
/// Sampling interval of every series (h)
pub const STEP_HOURS: f64 = 1.0;

/// Hourly instants from local midnight to 23:00 of `date`.
pub fn day_timestamps(
    date: NaiveDate,
    offset: FixedOffset,
) -> Result<Vec<DateTime<FixedOffset>>, ValidationError> {
    let midnight = offset
        .from_local_datetime(&date.and_time(chrono::NaiveTime::MIN))
        .single()
        .ok_or(ValidationError::UnresolvableTimestamp(date))?;

    (0..HOURS_PER_DAY)
        .map(|h| {
            midnight
                .checked_add_signed(TimeDelta::hours(h))
                .ok_or(ValidationError::DateOverflow(date))
        })
        .collect()
}

/// Accepts a requested range length, rejecting anything outside 1..=MAX_RANGE_DAYS.
pub fn checked_day_count(num_days: i64) -> Result<u32, ValidationError> {
    if num_days < 1 || num_days > MAX_RANGE_DAYS as i64 {
        return Err(ValidationError::DayCount {
            got: num_days,
            max: MAX_RANGE_DAYS,
        });
    }
    Ok(num_days as u32)
}

/// Consecutive calendar days `[start, start + num_days)`.
pub fn day_list(start: NaiveDate, num_days: u32) -> Result<Vec<NaiveDate>, ValidationError> {
    checked_day_count(num_days as i64)?;
    (0..num_days as u64)
        .map(|i| {
            start
                .checked_add_days(Days::new(i))
                .ok_or(ValidationError::DateOverflow(start))
        })
        .collect()
}
