//! Consecutive-day completion streaks

use std::collections::HashSet;

use chrono::{Days, NaiveDate};

/// Hard bound on how far back the streak walk looks
pub const MAX_STREAK_SCAN_DAYS: u32 = 365;

/// Count consecutive local days with at least one completion, walking back from `today`.
///
/// Today without a completion does not break the streak (the day may not be
/// over yet); it just isn't counted. Any earlier gap ends the walk.
pub fn current_streak<I>(completion_dates: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let days: HashSet<NaiveDate> = completion_dates.into_iter().collect();
    if days.is_empty() {
        return 0;
    }

    let mut streak = 0;
    for offset in 0..MAX_STREAK_SCAN_DAYS {
        let Some(day) = today.checked_sub_days(Days::new(u64::from(offset))) else {
            break;
        };
        if days.contains(&day) {
            streak += 1;
        } else if offset > 0 {
            break;
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 15).unwrap()
    }

    fn days_ago(offsets: &[u64]) -> Vec<NaiveDate> {
        offsets.iter().map(|&o| today() - Days::new(o)).collect()
    }

    #[test]
    fn test_three_consecutive_days_including_today() {
        assert_eq!(current_streak(days_ago(&[0, 1, 2]), today()), 3);
    }

    #[test]
    fn test_today_missing_does_not_break() {
        assert_eq!(current_streak(days_ago(&[1, 2]), today()), 2);
    }

    #[test]
    fn test_gap_yesterday_breaks() {
        assert_eq!(current_streak(days_ago(&[2]), today()), 0);
    }

    #[test]
    fn test_gap_stops_counting() {
        assert_eq!(current_streak(days_ago(&[0, 1, 2, 4, 5]), today()), 3);
    }

    #[test]
    fn test_multiple_completions_same_day_count_once() {
        assert_eq!(current_streak(days_ago(&[0, 0, 0, 1]), today()), 2);
    }

    #[test]
    fn test_no_completions() {
        assert_eq!(current_streak(Vec::new(), today()), 0);
    }

    #[test]
    fn test_future_completions_ignored() {
        let tomorrow = today() + Days::new(1);
        assert_eq!(current_streak(vec![tomorrow], today()), 0);
    }

    #[test]
    fn test_walk_is_bounded() {
        let all: Vec<u64> = (0..400).collect();
        assert_eq!(current_streak(days_ago(&all), today()), MAX_STREAK_SCAN_DAYS);
    }

    proptest! {
        #[test]
        fn prop_unbroken_run_counts_exactly(len in 1u64..300, skip_today in any::<bool>()) {
            let start = if skip_today { 1 } else { 0 };
            let offsets: Vec<u64> = (start..start + len).collect();
            prop_assert_eq!(current_streak(days_ago(&offsets), today()), len as u32);
        }
    }
}
