use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{total_commits, WeeklyCommitBucket};

/// A deeper look at one GitHub repository: who contributes, in which
/// languages, and how busy it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryAnalysis {
    pub repository: RepositoryOverview,
    pub statistics: AnalysisStatistics,
    pub contributors: Vec<ContributorSummary>,
    pub languages: Vec<LanguageShare>,
    pub commit_activity: Vec<WeeklyCommitBucket>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryOverview {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    /// GitHub's own counter, which includes open pull requests.
    pub open_issues: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatistics {
    pub total_commits: u64,
    pub average_commits_per_week: f64,
    pub pull_requests: u64,
    pub open_pull_requests: u64,
    pub issues: u64,
    pub open_issues: u64,
}

/// Totals and open items among the first page of a pull request or issue
/// listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemCounts {
    pub total: u64,
    pub open: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorSummary {
    pub username: String,
    pub avatar_url: Option<String>,
    pub total_commits: u64,
    pub total_additions: u64,
    pub total_deletions: u64,
    /// Weeks with at least one commit.
    pub active_weeks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageShare {
    pub language: String,
    pub bytes: u64,
    /// Share of all bytes, rounded to one decimal.
    pub percentage: f64,
}

impl AnalysisStatistics {
    pub fn new(
        commits: u64,
        buckets: &[WeeklyCommitBucket],
        pulls: ItemCounts,
        issues: ItemCounts,
    ) -> Self {
        Self {
            total_commits: commits,
            average_commits_per_week: average_per_week(buckets),
            pull_requests: pulls.total,
            open_pull_requests: pulls.open,
            issues: issues.total,
            open_issues: issues.open,
        }
    }
}

/// Mean commits per bucket; zero for an empty window.
pub fn average_per_week(buckets: &[WeeklyCommitBucket]) -> f64 {
    if buckets.is_empty() {
        return 0.0;
    }
    total_commits(buckets) as f64 / buckets.len() as f64
}

/// Turns a `language -> bytes` map into shares, largest first.
pub fn language_shares(bytes: &BTreeMap<String, u64>) -> Vec<LanguageShare> {
    let total: u64 = bytes.values().sum();
    let mut shares: Vec<_> = bytes
        .iter()
        .map(|(language, &bytes)| LanguageShare {
            language: language.clone(),
            bytes,
            percentage: if total == 0 {
                0.0
            } else {
                (bytes as f64 * 1000.0 / total as f64).round() / 10.0
            },
        })
        .collect();
    shares.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.language.cmp(&b.language)));
    shares
}

/// Most commits first, ties by name.
pub fn rank_contributors(mut contributors: Vec<ContributorSummary>) -> Vec<ContributorSummary> {
    contributors.sort_by(|a, b| {
        b.total_commits
            .cmp(&a.total_commits)
            .then_with(|| a.username.cmp(&b.username))
    });
    contributors
}
