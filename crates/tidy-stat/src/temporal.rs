//! Conversion of format-specific date encodings to Unix-epoch values.

use chrono::NaiveDate;

const MILLIS_PER_DAY: i64 = 86_400_000;

fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Days from `epoch` to 1970-01-01.
fn epoch_offset_days(year: i32, month: u32, day: u32) -> i64 {
    NaiveDate::from_ymd_opt(year, month, day)
        .map(|epoch| (unix_epoch() - epoch).num_days())
        .unwrap_or(0)
}

/// Stata `%td`: days since 1960-01-01.
#[must_use]
pub fn stata_days_to_unix(days: f64) -> Option<i32> {
    if !days.is_finite() {
        return None;
    }
    let shifted = days.floor() as i64 - epoch_offset_days(1960, 1, 1);
    i32::try_from(shifted).ok()
}

/// Stata `%tc`/`%tC`: milliseconds since 1960-01-01 00:00:00.
#[must_use]
pub fn stata_millis_to_unix(millis: f64) -> Option<i64> {
    if !millis.is_finite() {
        return None;
    }
    Some(millis.round() as i64 - epoch_offset_days(1960, 1, 1) * MILLIS_PER_DAY)
}

/// SPSS date: seconds since 1582-10-14, truncated to a day.
#[must_use]
pub fn spss_seconds_to_unix_days(seconds: f64) -> Option<i32> {
    if !seconds.is_finite() {
        return None;
    }
    let days = (seconds / 86_400.0).floor() as i64 - epoch_offset_days(1582, 10, 14);
    i32::try_from(days).ok()
}

/// SPSS datetime: seconds since 1582-10-14 00:00:00.
#[must_use]
pub fn spss_seconds_to_unix_millis(seconds: f64) -> Option<i64> {
    if !seconds.is_finite() {
        return None;
    }
    Some((seconds * 1000.0).round() as i64 - epoch_offset_days(1582, 10, 14) * MILLIS_PER_DAY)
}

/// R `Date`: days since 1970-01-01.
#[must_use]
pub fn r_days_to_unix(days: f64) -> Option<i32> {
    if !days.is_finite() {
        return None;
    }
    i32::try_from(days.floor() as i64).ok()
}

/// R `POSIXct`: seconds since the Unix epoch.
#[must_use]
pub fn r_seconds_to_unix_millis(seconds: f64) -> Option<i64> {
    if !seconds.is_finite() {
        return None;
    }
    Some((seconds * 1000.0).round() as i64)
}
