//! Monday-to-Sunday week windows in the display timezone.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::tz;

/// The seven civil dates (Monday..Sunday) of one week, plus its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekWindow {
    pub days: [NaiveDate; 7],
    /// Monday's date as `YYYY-MM-DD`; groups tasks and notes by week.
    pub week_key: String,
}

impl WeekWindow {
    /// Monday of this week.
    pub fn monday(&self) -> NaiveDate {
        self.days[0]
    }

    /// Sunday of this week.
    pub fn sunday(&self) -> NaiveDate {
        self.days[6]
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.monday() && date <= self.sunday()
    }

    /// Date of the given weekday within this week.
    pub fn day_for(&self, weekday: Weekday) -> NaiveDate {
        self.days[weekday.num_days_from_monday() as usize]
    }

    /// The following week.
    pub fn next(&self) -> WeekWindow {
        week_window_for_date(self.monday() + Days::new(7))
    }

    /// The preceding week.
    pub fn previous(&self) -> WeekWindow {
        week_window_for_date(self.monday() - Days::new(7))
    }
}

/// Compute the week window containing `reference`, as seen in the display timezone.
///
/// Any two instants in the same civil week produce identical windows.
pub fn compute_week_window(reference: DateTime<Utc>) -> WeekWindow {
    week_window_for_date(tz::civil_date(reference))
}

/// Compute the week window containing a civil date.
pub fn week_window_for_date(date: NaiveDate) -> WeekWindow {
    let monday = monday_of(date);
    let mut days = [monday; 7];
    for (offset, day) in days.iter_mut().enumerate().skip(1) {
        *day = monday + Days::new(offset as u64);
    }

    WeekWindow {
        days,
        week_key: tz::date_key(monday),
    }
}

/// Week key (Monday's date key) for a civil date.
pub fn week_key_for_date(date: NaiveDate) -> String {
    tz::date_key(monday_of(date))
}

/// Whether a `YYYY-MM-DD` key is strictly before today in the display timezone.
///
/// Plain string comparison is correct because keys are zero padded.
pub fn is_past_day(date_key: &str, now: DateTime<Utc>) -> bool {
    date_key < tz::today_key(now).as_str()
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    // Sunday=0..Saturday=6
    let weekday = date.weekday().num_days_from_sunday();
    let back_to_monday = if weekday == 0 { 6 } else { weekday - 1 };
    date - Days::new(u64::from(back_to_monday))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assert_well_formed(window: &WeekWindow) {
        assert_eq!(window.monday().weekday(), Weekday::Mon);
        for pair in window.days.windows(2) {
            assert_eq!(pair[0] + Days::new(1), pair[1]);
        }
        assert_eq!(window.week_key, tz::date_key(window.days[0]));
    }

    #[test]
    fn test_week_window_from_midweek() {
        let reference = Utc.with_ymd_and_hms(2024, 6, 12, 16, 0, 0).unwrap();
        let window = compute_week_window(reference);

        assert_well_formed(&window);
        assert_eq!(window.week_key, "2024-06-10");
        assert_eq!(window.sunday(), date(2024, 6, 16));
    }

    #[test]
    fn test_sunday_belongs_to_previous_monday() {
        let reference = Utc.with_ymd_and_hms(2024, 6, 16, 15, 0, 0).unwrap();
        let window = compute_week_window(reference);
        assert_eq!(window.week_key, "2024-06-10");
    }

    #[test]
    fn test_late_sunday_utc_is_still_sunday_in_new_york() {
        // Monday 02:00 UTC is Sunday 22:00 EDT.
        let reference = Utc.with_ymd_and_hms(2024, 6, 17, 2, 0, 0).unwrap();
        let window = compute_week_window(reference);
        assert_eq!(window.week_key, "2024-06-10");
    }

    #[test]
    fn test_same_week_is_idempotent() {
        let monday_morning = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();
        let saturday_night = Utc.with_ymd_and_hms(2024, 3, 10, 3, 59, 0).unwrap();
        assert_eq!(
            compute_week_window(monday_morning),
            compute_week_window(saturday_night)
        );
    }

    #[test]
    fn test_window_spanning_dst_and_year_end() {
        let dst = compute_week_window(Utc.with_ymd_and_hms(2024, 3, 10, 18, 0, 0).unwrap());
        assert_well_formed(&dst);
        assert_eq!(dst.week_key, "2024-03-04");

        let new_year = compute_week_window(Utc.with_ymd_and_hms(2025, 1, 1, 17, 0, 0).unwrap());
        assert_well_formed(&new_year);
        assert_eq!(new_year.week_key, "2024-12-30");
        assert_eq!(new_year.sunday(), date(2025, 1, 5));
    }

    #[test]
    fn test_every_day_of_a_month_maps_to_a_monday() {
        for day in 1..=31 {
            let window = week_window_for_date(date(2024, 10, day));
            assert_well_formed(&window);
            assert!(window.contains(date(2024, 10, day)));
        }
    }

    #[test]
    fn test_next_previous_and_day_for() {
        let window = week_window_for_date(date(2024, 2, 28));
        assert_eq!(window.next().week_key, "2024-03-04");
        assert_eq!(window.previous().week_key, "2024-02-19");
        assert_eq!(window.day_for(Weekday::Thu), date(2024, 2, 29));
        assert_eq!(week_key_for_date(date(2024, 2, 29)), "2024-02-26");
    }

    #[test]
    fn test_is_past_day() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 14, 0, 0).unwrap();
        assert!(is_past_day("2024-06-09", now));
        assert!(!is_past_day("2024-06-10", now));
        assert!(!is_past_day("2024-06-11", now));
    }
}
