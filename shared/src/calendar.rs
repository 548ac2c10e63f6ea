use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::stats::{WeeklyCommitBucket, SECONDS_PER_DAY};

/// Days before "today" covered by a calendar. Together with today itself the
/// calendar holds `CALENDAR_LOOKBACK_DAYS + 1` entries.
pub const CALENDAR_LOOKBACK_DAYS: u64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionDay {
    pub date: NaiveDate,
    pub count: u64,
}

/// Daily contribution estimate over `[today - 365 days, today]`, one entry per
/// date in ascending order.
///
/// Counts are derived by spreading weekly commit buckets evenly over their
/// seven days, so they are an approximation rather than real daily activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionCalendar {
    pub days: Vec<ContributionDay>,
    pub total_contributions: u64,
}

impl ContributionCalendar {
    pub fn empty(today: NaiveDate) -> Self {
        CalendarBuilder::new(today).build()
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        self.days.first().map(|day| day.date)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.days.last().map(|day| day.date)
    }
}

/// Accumulates weekly activity into per-day counts.
#[derive(Debug, Clone)]
pub struct CalendarBuilder {
    counts: BTreeMap<NaiveDate, u64>,
}

impl CalendarBuilder {
    pub fn new(today: NaiveDate) -> Self {
        let start = today
            .checked_sub_days(Days::new(CALENDAR_LOOKBACK_DAYS))
            .unwrap_or(NaiveDate::MIN);
        let counts = start
            .iter_days()
            .take_while(|date| *date <= today)
            .map(|date| (date, 0))
            .collect();
        Self { counts }
    }

    /// Adds `floor(total / 7)` to each of the bucket's seven days that fall
    /// inside the window. The division remainder is dropped.
    pub fn add_weekly_activity(&mut self, buckets: &[WeeklyCommitBucket]) {
        for bucket in buckets {
            let per_day = bucket.total / 7;
            if per_day == 0 {
                continue;
            }
            for offset in 0..7 {
                let Some(date) =
                    DateTime::from_timestamp(bucket.week_start + offset * SECONDS_PER_DAY, 0)
                        .map(|time| time.date_naive())
                else {
                    continue;
                };
                if let Some(count) = self.counts.get_mut(&date) {
                    *count += per_day;
                }
            }
        }
    }

    pub fn build(self) -> ContributionCalendar {
        let days: Vec<_> = self
            .counts
            .into_iter()
            .map(|(date, count)| ContributionDay { date, count })
            .collect();
        let total_contributions = days.iter().map(|day| day.count).sum();
        ContributionCalendar {
            days,
            total_contributions,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::stats::week_index;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bucket_starting(day: NaiveDate, total: u64) -> WeeklyCommitBucket {
        let ts = day.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        WeeklyCommitBucket {
            week_start: ts,
            total,
        }
    }

    #[test]
    fn empty_calendar_is_dense() {
        let today = date(2024, 3, 1);
        let calendar = ContributionCalendar::empty(today);

        assert_eq!(calendar.days.len(), 366);
        assert_eq!(calendar.first_day(), Some(date(2023, 3, 2)));
        assert_eq!(calendar.last_day(), Some(today));
        assert_eq!(calendar.total_contributions, 0);
        for pair in calendar.days.windows(2) {
            assert_eq!(pair[0].date.succ_opt(), Some(pair[1].date));
        }
    }

    #[test]
    fn spreads_weekly_totals_and_drops_remainder() {
        let today = date(2024, 6, 30);
        let mut builder = CalendarBuilder::new(today);
        builder.add_weekly_activity(&[bucket_starting(date(2024, 6, 2), 15)]);
        let calendar = builder.build();

        let touched: Vec<_> = calendar.days.iter().filter(|d| d.count > 0).collect();
        assert_eq!(touched.len(), 7);
        assert!(touched.iter().all(|d| d.count == 2));
        assert_eq!(touched[0].date, date(2024, 6, 2));
        assert_eq!(calendar.total_contributions, 14);
    }

    #[test]
    fn accumulates_across_repositories() {
        let today = date(2024, 6, 30);
        let mut builder = CalendarBuilder::new(today);
        let bucket = bucket_starting(date(2024, 6, 9), 7);
        builder.add_weekly_activity(&[bucket]);
        builder.add_weekly_activity(&[bucket]);
        let calendar = builder.build();

        let day = calendar
            .days
            .iter()
            .find(|d| d.date == date(2024, 6, 10))
            .unwrap();
        assert_eq!(day.count, 2);
        assert_eq!(calendar.total_contributions, 14);
        assert_eq!(calendar.days.len(), 366);
    }

    #[test]
    fn ignores_days_outside_window() {
        let today = date(2024, 6, 30);
        let mut builder = CalendarBuilder::new(today);
        builder.add_weekly_activity(&[
            bucket_starting(date(2020, 1, 1), 70),
            // straddles today: only days up to today count
            bucket_starting(date(2024, 6, 28), 7),
        ]);
        let calendar = builder.build();

        assert_eq!(calendar.total_contributions, 3);
        assert_eq!(calendar.days.len(), 366);
    }

    #[test]
    fn epoch_aligned_buckets_land_on_their_days() {
        let today = date(2024, 6, 30);
        let ts = date(2024, 6, 1).and_hms_opt(12, 0, 0).unwrap().and_utc().timestamp();
        let bucket = WeeklyCommitBucket::for_week_index(week_index(ts), 14);
        let mut builder = CalendarBuilder::new(today);
        builder.add_weekly_activity(&[bucket]);

        assert_eq!(builder.build().total_contributions, 14);
    }
}
