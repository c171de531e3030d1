//! Release date scheduling
//!
//! Milestones are due on the second Monday of the month following the
//! release, at 17:00 UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

/// Compute the due date for the next milestone: the second Monday of the
/// month following `today`
pub fn due_date(today: NaiveDate) -> NaiveDate {
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    // Day 1 of a valid (year, month) always exists.
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .expect("first day of month is a valid date");
    let until_monday = (7 - first.weekday().num_days_from_monday()) % 7;
    first + Duration::days(i64::from(until_monday) + 7)
}

/// The milestone `due_on` timestamp: the due date pinned at 17:00 UTC
pub fn milestone_due_on(today: NaiveDate) -> DateTime<Utc> {
    let date = due_date(today);
    Utc.from_utc_datetime(
        &date
            .and_hms_opt(17, 0, 0)
            .expect("17:00:00 is a valid time of day"),
    )
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_second_monday_of_following_month() {
        assert_eq!(due_date(date(2025, 1, 1)), date(2025, 2, 10));
        assert_eq!(due_date(date(2025, 1, 14)), date(2025, 2, 10));
        assert_eq!(due_date(date(2025, 9, 1)), date(2025, 10, 13));
    }

    #[test]
    fn test_first_of_month_on_a_monday() {
        // September 2025 starts on a Monday; the second Monday is the 8th.
        assert_eq!(due_date(date(2025, 8, 15)), date(2025, 9, 8));
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        assert_eq!(due_date(date(2025, 12, 20)), date(2026, 1, 12));
    }

    #[test]
    fn test_result_is_always_a_monday() {
        let mut day = date(2025, 1, 1);
        for _ in 0..365 {
            assert_eq!(due_date(day).weekday(), Weekday::Mon);
            day += Duration::days(1);
        }
    }

    #[test]
    fn test_due_on_is_pinned_at_1700_utc() {
        let due = milestone_due_on(date(2025, 1, 1));
        assert_eq!(due.to_rfc3339(), "2025-02-10T17:00:00+00:00");
    }
}
