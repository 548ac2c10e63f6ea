use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    AccountProfile, ContributorSummary, ItemCounts, PlatformId, RepositoryOverview,
    RepositorySummary, WeeklyCommitBucket,
};

#[derive(Debug, Clone, Deserialize)]
pub struct GithubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl From<GithubUser> for AccountProfile {
    fn from(user: GithubUser) -> Self {
        Self {
            platform: PlatformId::GitHub,
            login: user.login,
            name: user.name,
            avatar_url: user.avatar_url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubRepository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    pub html_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<GithubRepository> for RepositorySummary {
    fn from(repo: GithubRepository) -> Self {
        Self {
            id: repo.id.to_string(),
            name: repo.name,
            full_name: repo.full_name,
            description: repo.description,
            is_private: repo.private,
            url: repo.html_url,
            default_branch: repo.default_branch,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            updated_at: repo.updated_at,
            platform: PlatformId::GitHub,
        }
    }
}

impl From<&GithubRepository> for RepositoryOverview {
    fn from(repo: &GithubRepository) -> Self {
        Self {
            name: repo.name.clone(),
            full_name: repo.full_name.clone(),
            description: repo.description.clone(),
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            watchers: repo.watchers_count,
            open_issues: repo.open_issues_count,
            created_at: repo.created_at,
            updated_at: repo.updated_at,
        }
    }
}

/// One week of `/stats/commit_activity`. `days` is ignored.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GithubCommitWeek {
    pub week: i64,
    pub total: u64,
}

impl From<GithubCommitWeek> for WeeklyCommitBucket {
    fn from(week: GithubCommitWeek) -> Self {
        Self {
            week_start: week.week,
            total: week.total,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubCommit {
    pub commit: GithubCommitDetails,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubCommitDetails {
    #[serde(default)]
    pub author: Option<GithubSignature>,
    #[serde(default)]
    pub committer: Option<GithubSignature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubSignature {
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl GithubCommit {
    pub fn authored_at(&self) -> Option<DateTime<Utc>> {
        let date = |sig: &Option<GithubSignature>| sig.as_ref().and_then(|s| s.date);
        date(&self.commit.author).or_else(|| date(&self.commit.committer))
    }
}

/// Just enough of a pull request or issue to count it.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubIssue {
    pub number: u64,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl GithubIssue {
    /// The issues endpoint also lists pull requests.
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn is_open(&self) -> bool {
        self.state.as_deref() == Some("open")
    }
}

pub fn tally<'a>(items: impl IntoIterator<Item = &'a GithubIssue>) -> ItemCounts {
    items.into_iter().fold(ItemCounts::default(), |counts, item| ItemCounts {
        total: counts.total + 1,
        open: counts.open + u64::from(item.is_open()),
    })
}

/// One entry of `/stats/contributors`.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubContributor {
    /// `null` for commits whose author has no GitHub account.
    #[serde(default)]
    pub author: Option<GithubContributorAuthor>,
    #[serde(default)]
    pub weeks: Vec<GithubContributorWeek>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubContributorAuthor {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GithubContributorWeek {
    #[serde(rename = "a", default)]
    pub additions: u64,
    #[serde(rename = "d", default)]
    pub deletions: u64,
    #[serde(rename = "c", default)]
    pub commits: u64,
}

impl GithubContributor {
    /// Anonymous contributors have no login to report and are dropped.
    pub fn summarize(self) -> Option<ContributorSummary> {
        let author = self.author?;
        let mut summary = ContributorSummary {
            username: author.login,
            avatar_url: author.avatar_url,
            total_commits: 0,
            total_additions: 0,
            total_deletions: 0,
            active_weeks: 0,
        };
        for week in &self.weeks {
            summary.total_commits += week.commits;
            summary.total_additions += week.additions;
            summary.total_deletions += week.deletions;
            summary.active_weeks += u64::from(week.commits > 0);
        }
        Some(summary)
    }
}
