//! Time-of-day arithmetic for simulated driving.

use chrono::{Duration, NaiveTime};

const MINUTES_PER_DAY: f64 = 24.0 * 60.0;

/// Last representable instant of the simulated day.
pub(crate) fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or_default()
}

/// Minutes needed to drive `distance` miles at `speed_mph`.
pub(crate) fn travel_minutes(distance: f64, speed_mph: f64) -> f64 {
    if distance <= 0.0 {
        return 0.0;
    }
    distance / speed_mph * 60.0
}

/// Moves `time` forward by `minutes`, saturating at the end of the day
/// instead of wrapping past midnight.
pub(crate) fn advance(time: NaiveTime, minutes: f64) -> NaiveTime {
    if minutes.is_nan() || minutes <= 0.0 {
        return time;
    }
    if minutes >= MINUTES_PER_DAY {
        return end_of_day();
    }
    let ms = (minutes * 60_000.0).round() as i64;
    let (next, wrapped) = time.overflowing_add_signed(Duration::milliseconds(ms));
    if wrapped != 0 {
        end_of_day()
    } else {
        next
    }
}

/// Signed minutes from `from` to `to`.
pub(crate) fn minutes_between(from: NaiveTime, to: NaiveTime) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid")
    }

    #[test]
    fn test_travel_minutes() {
        assert!((travel_minutes(18.0, 18.0) - 60.0).abs() < 1e-10);
        assert!((travel_minutes(3.0, 18.0) - 10.0).abs() < 1e-10);
        assert_eq!(travel_minutes(0.0, 18.0), 0.0);
    }

    #[test]
    fn test_advance() {
        assert_eq!(advance(t(8, 0), 20.0), t(8, 20));
        assert_eq!(advance(t(8, 0), 0.0), t(8, 0));
        assert_eq!(advance(t(8, 0), 90.5), NaiveTime::from_hms_opt(9, 30, 30).expect("valid"));
    }

    #[test]
    fn test_advance_saturates() {
        assert_eq!(advance(t(23, 30), 45.0), end_of_day());
        assert_eq!(advance(t(8, 0), f64::INFINITY), end_of_day());
    }

    #[test]
    fn test_minutes_between() {
        assert!((minutes_between(t(8, 0), t(10, 30)) - 150.0).abs() < 1e-10);
        assert!((minutes_between(t(10, 30), t(8, 0)) + 150.0).abs() < 1e-10);
    }
}
