//! Excel serial date conversion (1900 date system)
//!
//! Serial 1 is 1900-01-01. Serial 60 is the non-existent 1900-02-29 kept for
//! Lotus compatibility, so dates before 1900-03-01 are shifted by one day.

use chrono::{Duration, NaiveDate, NaiveDateTime};

const MS_PER_DAY: f64 = 86_400_000.0;

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

fn leap_bug_cutoff() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1900, 3, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Convert a timestamp to its serial number. Timestamps before
/// 1900-01-01 yield a value `<= 0`.
pub fn datetime_to_serial(t: NaiveDateTime) -> f64 {
    let mut days = (t - epoch()).num_milliseconds() as f64 / MS_PER_DAY;
    if t < leap_bug_cutoff() {
        days -= 1.0;
    }
    days
}

/// Convert a serial number back to a timestamp, rounded to the millisecond.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let mut days = serial;
    if serial < 61.0 {
        // Serial 60 (1900-02-29) has no real date and maps onto 1900-02-28.
        days += if serial >= 60.0 { 0.0 } else { 1.0 };
    }
    let ms = (days * MS_PER_DAY).round();
    if ms > i64::MAX as f64 {
        return None;
    }
    epoch().checked_add_signed(Duration::milliseconds(ms as i64))
}

/// Fraction of a day represented by `d`, as stored by duration cells.
pub fn duration_to_days(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / MS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_serials() {
        assert_eq!(datetime_to_serial(ymd(1900, 1, 1)), 1.0);
        assert_eq!(datetime_to_serial(ymd(1900, 2, 28)), 59.0);
        assert_eq!(datetime_to_serial(ymd(1900, 3, 1)), 61.0);
        assert_eq!(datetime_to_serial(ymd(2011, 11, 20)), 40867.0);
        assert!(datetime_to_serial(ymd(1899, 12, 31)) <= 0.0);

        let noon = ymd(2020, 1, 1) + Duration::hours(12);
        assert_eq!(datetime_to_serial(noon), 43831.5);
    }

    #[test]
    fn test_serial_to_datetime() {
        assert_eq!(serial_to_datetime(1.0), Some(ymd(1900, 1, 1)));
        assert_eq!(serial_to_datetime(61.0), Some(ymd(1900, 3, 1)));
        assert_eq!(serial_to_datetime(40867.0), Some(ymd(2011, 11, 20)));
        assert_eq!(serial_to_datetime(-1.0), None);
    }

    #[test]
    fn test_duration_to_days() {
        assert_eq!(duration_to_days(Duration::hours(6)), 0.25);
    }
}
