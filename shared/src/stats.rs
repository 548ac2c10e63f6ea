use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};

pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
pub const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// Commits counted over one epoch-aligned 7-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyCommitBucket {
    /// Start of the window in seconds since the Unix epoch.
    #[serde(rename = "week")]
    pub week_start: i64,
    pub total: u64,
}

impl WeeklyCommitBucket {
    pub const fn for_week_index(index: i64, total: u64) -> Self {
        Self {
            week_start: index * SECONDS_PER_WEEK,
            total,
        }
    }

    pub const fn week_index(&self) -> i64 {
        self.week_start.div_euclid(SECONDS_PER_WEEK)
    }
}

/// Where `commit_activity` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivitySource {
    /// The platform's own weekly aggregate.
    Native,
    /// Rebuilt from a sample of recent commits. `commits` only counts the sample.
    Reconstructed,
    /// No commit data could be fetched; buckets are zero-filled.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStats {
    pub commits: u64,
    pub pull_requests: u64,
    pub issues: u64,
    pub stars: u64,
    pub forks: u64,
    pub commit_activity: Vec<WeeklyCommitBucket>,
    pub activity_source: ActivitySource,
}

pub fn week_index(timestamp: i64) -> i64 {
    timestamp.div_euclid(SECONDS_PER_WEEK)
}

/// Buckets raw commit times by epoch week. Every week between the oldest and
/// the newest commit is present, so the output is gap-free, strictly ascending,
/// and its totals sum to `commit_times.len()`.
pub fn reconstruct_weekly_buckets(commit_times: &[DateTime<Utc>]) -> Vec<WeeklyCommitBucket> {
    let (oldest, newest) = match commit_times.iter().minmax() {
        MinMaxResult::NoElements => return Vec::new(),
        MinMaxResult::OneElement(only) => (*only, *only),
        MinMaxResult::MinMax(oldest, newest) => (*oldest, *newest),
    };

    let mut weeks: BTreeMap<i64, u64> = (week_index(oldest.timestamp())
        ..=week_index(newest.timestamp()))
        .map(|week| (week, 0))
        .collect();

    for time in commit_times {
        *weeks.entry(week_index(time.timestamp())).or_default() += 1;
    }

    weeks
        .into_iter()
        .map(|(week, total)| WeeklyCommitBucket::for_week_index(week, total))
        .collect()
}

/// `count` zero buckets ending with the week containing `now`.
pub fn empty_activity(now: DateTime<Utc>, count: usize) -> Vec<WeeklyCommitBucket> {
    let current = week_index(now.timestamp());
    let count = count as i64;
    (current - count + 1..=current)
        .map(|week| WeeklyCommitBucket::for_week_index(week, 0))
        .collect()
}

/// Reconstruction for platforms without a native aggregate: keep only the most
/// recent `weeks` buckets, or a zero-filled window when there is nothing to bucket.
pub fn recent_weekly_buckets(
    commit_times: &[DateTime<Utc>],
    now: DateTime<Utc>,
    weeks: usize,
) -> Vec<WeeklyCommitBucket> {
    let mut buckets = reconstruct_weekly_buckets(commit_times);
    if buckets.is_empty() {
        return empty_activity(now, weeks);
    }
    let skip = buckets.len().saturating_sub(weeks);
    buckets.drain(..skip);
    buckets
}

pub fn total_commits(buckets: &[WeeklyCommitBucket]) -> u64 {
    buckets.iter().map(|bucket| bucket.total).sum()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn no_commits_no_buckets() {
        assert!(reconstruct_weekly_buckets(&[]).is_empty());
    }

    #[test]
    fn sparse_history_is_zero_filled() {
        let first = at(10 * SECONDS_PER_WEEK + 100);
        let commits = [first, first + Duration::weeks(3), first + Duration::weeks(3)];

        let buckets = reconstruct_weekly_buckets(&commits);

        assert_eq!(
            buckets,
            vec![
                WeeklyCommitBucket::for_week_index(10, 1),
                WeeklyCommitBucket::for_week_index(11, 0),
                WeeklyCommitBucket::for_week_index(12, 0),
                WeeklyCommitBucket::for_week_index(13, 2),
            ]
        );
    }

    #[test]
    fn order_of_input_does_not_matter() {
        let newest = at(1_700_000_000);
        let commits: Vec<_> = (0..5).map(|i| newest - Duration::days(i * 2)).collect();
        let mut reversed = commits.clone();
        reversed.reverse();

        assert_eq!(
            reconstruct_weekly_buckets(&commits),
            reconstruct_weekly_buckets(&reversed)
        );
        assert_eq!(total_commits(&reconstruct_weekly_buckets(&commits)), 5);
    }

    #[test]
    fn empty_activity_ends_at_current_week() {
        let now = at(100 * SECONDS_PER_WEEK + 5);
        let buckets = empty_activity(now, 12);
        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets.first().unwrap().week_index(), 89);
        assert_eq!(buckets.last().unwrap().week_index(), 100);
        assert_eq!(total_commits(&buckets), 0);
    }

    #[test]
    fn recent_buckets_keep_latest_weeks() {
        let now = at(200 * SECONDS_PER_WEEK);
        let commits: Vec<_> = (0..20).map(|i| now - Duration::weeks(i)).collect();

        let buckets = recent_weekly_buckets(&commits, now, 12);

        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets.last().unwrap().week_index(), 200);
        assert!(buckets.iter().all(|b| b.total == 1));
        assert_eq!(recent_weekly_buckets(&[], now, 12), empty_activity(now, 12));
    }

    #[test]
    fn pre_epoch_timestamps_floor_downwards() {
        assert_eq!(week_index(-1), -1);
        assert_eq!(week_index(0), 0);
        assert_eq!(week_index(SECONDS_PER_WEEK - 1), 0);
    }

    proptest! {
        #[test]
        fn reconstruction_is_ordered_and_conserves_commits(
            offsets in prop::collection::vec(0i64..(400 * SECONDS_PER_DAY), 0..150)
        ) {
            let base = 1_600_000_000;
            let commits: Vec<_> = offsets.iter().map(|o| at(base + o)).collect();
            let buckets = reconstruct_weekly_buckets(&commits);

            prop_assert_eq!(total_commits(&buckets), commits.len() as u64);
            for pair in buckets.windows(2) {
                prop_assert_eq!(pair[0].week_index() + 1, pair[1].week_index());
            }
        }
    }
}
