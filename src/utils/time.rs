use chrono::NaiveDate;

/// Whole-day difference between two calendar days. Negative when `to`
/// precedes `from`.
pub fn day_diff(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Returns an iterator of days between start (inclusive) and end (inclusive).
pub fn day_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(start), |current| current.succ_opt())
        .take_while(move |current| *current <= end)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{day_diff, day_range};

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();

    #[test]
    fn day_diff_signs() {
        let later = NaiveDate::from_ymd_opt(2024, 4, 8).unwrap();
        assert_eq!(day_diff(TEST_DATE, later), 3);
        assert_eq!(day_diff(later, TEST_DATE), -3);
        assert_eq!(day_diff(TEST_DATE, TEST_DATE), 0);
    }

    #[test]
    fn day_range_is_inclusive() {
        let end = NaiveDate::from_ymd_opt(2024, 4, 7).unwrap();
        let days = day_range(TEST_DATE, end).collect::<Vec<_>>();
        assert_eq!(
            days,
            vec![
                TEST_DATE,
                NaiveDate::from_ymd_opt(2024, 4, 6).unwrap(),
                NaiveDate::from_ymd_opt(2024, 4, 7).unwrap(),
            ]
        );
    }

    #[test]
    fn day_range_crosses_month_boundary() {
        let start = NaiveDate::from_ymd_opt(2024, 4, 29).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        assert_eq!(day_range(start, end).count(), 4);
    }

    #[test]
    fn day_range_empty_when_end_precedes_start() {
        let end = NaiveDate::from_ymd_opt(2024, 4, 4).unwrap();
        assert_eq!(day_range(TEST_DATE, end).count(), 0);
    }
}
