use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::{service::middleware::retry::RetryConfig, Octocrab, Page};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::{
    analysis::{language_shares, rank_contributors},
    metrics::{ApiMetrics, Outcome},
    reconciler::{or_degraded, NativeActivity, Reconciler},
    service::PlatformClient,
    AccountProfile, AnalysisStatistics, ClientConfig, GitError, ItemCounts, PlatformId,
    RepoIdentity, RepositoryAnalysis, RepositoryStats, RepositorySummary, Result,
};

mod types;

use types::*;

const PLATFORM: PlatformId = PlatformId::GitHub;

/// GitHub REST client. Requests go through `octocrab`, with lean response
/// types so that only the fields the stats model needs are decoded.
///
/// Octocrab's own retry layer is switched off: a 429 or 5xx reaches the caller
/// after one request, and only the `/stats/*` polls are retried.
///
/// Construction needs a running tokio runtime.
#[derive(Debug, Clone)]
pub struct GithubClient {
    octocrab: Octocrab,
    config: ClientConfig,
    reconciler: Reconciler,
    metrics: Arc<ApiMetrics>,
}

impl GithubClient {
    pub fn new(token: String, config: &ClientConfig, metrics: Arc<ApiMetrics>) -> Result<Self> {
        let octocrab = Octocrab::builder()
            .personal_token(token)
            .base_uri(config.api_url(PLATFORM))
            .map_err(map_error)?
            .set_connect_timeout(Some(config.request_timeout()))
            .set_read_timeout(Some(config.request_timeout()))
            .add_retry_config(RetryConfig::None)
            .build()
            .map_err(map_error)?;

        Ok(Self {
            octocrab,
            config: config.clone(),
            reconciler: Reconciler::new(PLATFORM, config, metrics.clone()),
            metrics,
        })
    }

    fn observe<T>(&self, result: octocrab::Result<T>) -> Result<T> {
        let result = result.map_err(map_error);
        self.metrics.record(PLATFORM, &result);
        result
    }

    /// One poll of a `/stats/*` endpoint. GitHub answers 202 while the
    /// aggregate is being computed and 204 when there is nothing to aggregate.
    async fn computed<T: DeserializeOwned + Default>(&self, route: &str) -> Result<NativeActivity<T>> {
        let result = self.fetch_computed(route).await;
        match &result {
            Ok(NativeActivity::Computing) => self.metrics.record_outcome(PLATFORM, Outcome::Computing),
            other => self.metrics.record(PLATFORM, other),
        }
        result
    }

    async fn fetch_computed<T: DeserializeOwned + Default>(&self, route: &str) -> Result<NativeActivity<T>> {
        let response = self.octocrab._get(route).await.map_err(map_error)?;
        match response.status().as_u16() {
            202 => return Ok(NativeActivity::Computing),
            204 => return Ok(NativeActivity::Ready(T::default())),
            _ => {}
        }

        let response = octocrab::map_github_error(response)
            .await
            .map_err(map_error)?;
        let body = self
            .octocrab
            .body_to_string(response)
            .await
            .map_err(map_error)?;
        let value = serde_json::from_str(&body).map_err(|e| GitError::unexpected(PLATFORM, e))?;
        Ok(NativeActivity::Ready(value))
    }

    async fn commit_activity(&self, owner: &str, repo: &str) -> Result<NativeActivity> {
        let weeks: NativeActivity<Vec<GithubCommitWeek>> = self
            .computed(&format!("/repos/{owner}/{repo}/stats/commit_activity"))
            .await?;
        Ok(weeks.map(|weeks| weeks.into_iter().map(Into::into).collect()))
    }

    async fn contributor_stats(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<NativeActivity<Vec<GithubContributor>>> {
        self.computed(&format!("/repos/{owner}/{repo}/stats/contributors"))
            .await
    }

    /// Dates of the most recent commits on the default branch. Commits without
    /// any date are skipped.
    async fn recent_commit_times(&self, owner: &str, repo: &str) -> Result<Vec<DateTime<Utc>>> {
        let params = [(
            "per_page",
            self.config.recent_commit_sample.clamp(1, 100).to_string(),
        )];
        let commits: Vec<GithubCommit> = self.observe(
            self.octocrab
                .get(format!("/repos/{owner}/{repo}/commits"), Some(&params))
                .await,
        )?;
        let times: Vec<_> = commits.iter().filter_map(GithubCommit::authored_at).collect();
        if times.len() < commits.len() {
            debug!(
                fetched = commits.len(),
                skipped = commits.len() - times.len(),
                "ignoring commits without a date"
            );
        }
        Ok(times)
    }

    /// First page of 100 pull requests or issues, in any state.
    async fn first_page(&self, owner: &str, repo: &str, kind: &str) -> Result<Vec<GithubIssue>> {
        self.observe(
            self.octocrab
                .get(format!("/repos/{owner}/{repo}/{kind}"), Some(&first_page_params()))
                .await,
        )
    }

    async fn count_pull_requests(&self, owner: &str, repo: &str) -> Result<ItemCounts> {
        let pulls = self.first_page(owner, repo, "pulls").await?;
        Ok(tally(&pulls))
    }

    /// The issues endpoint also lists pull requests; they are left out.
    async fn count_issues(&self, owner: &str, repo: &str) -> Result<ItemCounts> {
        let issues = self.first_page(owner, repo, "issues").await?;
        Ok(tally(issues.iter().filter(|issue| !issue.is_pull_request())))
    }

    async fn languages(&self, owner: &str, repo: &str) -> Result<BTreeMap<String, u64>> {
        self.observe(
            self.octocrab
                .get(format!("/repos/{owner}/{repo}/languages"), None::<&()>)
                .await,
        )
    }

    async fn repository(&self, identity: &RepoIdentity, owner: &str, repo: &str) -> Result<GithubRepository> {
        self.observe(
            self.octocrab
                .get(format!("/repos/{owner}/{repo}"), None::<&()>)
                .await,
        )
        .map_err(|e| match e {
            GitError::NotFound { platform, .. } => GitError::NotFound {
                platform,
                resource: identity.to_string(),
            },
            e => e,
        })
    }

    /// Contributors, languages and activity of one repository.
    ///
    /// Contributor statistics are polled like commit activity. When they are
    /// still being computed after the last attempt the contributor list is
    /// empty. Languages, pull requests and issues degrade to empty on failure.
    #[instrument(skip(self))]
    pub async fn analyze_repository(&self, identity: &RepoIdentity) -> Result<RepositoryAnalysis> {
        let (owner, repo) = github_pair(identity)?;
        let details = self.repository(identity, owner, repo).await?;

        let (activity, contributors, languages, pulls, issues) = tokio::join!(
            self.reconciler.resolve_commit_activity(
                move || self.commit_activity(owner, repo),
                move || self.recent_commit_times(owner, repo),
                Utc::now(),
            ),
            self.reconciler
                .poll_computed("contributor stats", move || self.contributor_stats(owner, repo)),
            self.languages(owner, repo),
            self.count_pull_requests(owner, repo),
            self.count_issues(owner, repo),
        );
        let activity = activity?;
        let contributors = contributors?.unwrap_or_else(|| {
            warn!("contributor stats still being computed, leaving them out");
            Vec::new()
        });

        let pulls = or_degraded(PLATFORM, "pull requests", pulls);
        let issues = or_degraded(PLATFORM, "issues", issues);
        Ok(RepositoryAnalysis {
            repository: (&details).into(),
            statistics: AnalysisStatistics::new(activity.commits, &activity.buckets, pulls, issues),
            contributors: rank_contributors(
                contributors
                    .into_iter()
                    .filter_map(GithubContributor::summarize)
                    .collect(),
            ),
            languages: language_shares(&or_degraded(PLATFORM, "languages", languages)),
            commit_activity: activity.buckets,
        })
    }
}

#[async_trait]
impl PlatformClient for GithubClient {
    fn platform(&self) -> PlatformId {
        PLATFORM
    }

    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<AccountProfile> {
        let user: GithubUser = self.observe(self.octocrab.get("/user", None::<&()>).await)?;
        Ok(user.into())
    }

    #[instrument(skip(self))]
    async fn list_repositories(&self) -> Result<Vec<RepositorySummary>> {
        let params = [
            ("per_page", self.config.page_size().to_string()),
            ("sort", "updated".to_string()),
        ];
        let mut page: Page<GithubRepository> =
            self.observe(self.octocrab.get("/user/repos", Some(&params)).await)?;

        let mut repositories = Vec::new();
        let mut fetched_pages = 1;
        loop {
            repositories.extend(page.take_items().into_iter().map(RepositorySummary::from));

            if page.next.is_none() {
                break;
            }
            if fetched_pages >= self.config.max_repository_pages {
                warn!(
                    pages = fetched_pages,
                    "repository listing truncated at the page limit"
                );
                break;
            }
            match self.observe(self.octocrab.get_page(&page.next).await)? {
                Some(next) => {
                    page = next;
                    fetched_pages += 1;
                }
                None => break,
            }
        }

        Ok(crate::repository::dedup_by_full_name(repositories))
    }

    #[instrument(skip(self))]
    async fn get_repository_stats(&self, identity: &RepoIdentity) -> Result<RepositoryStats> {
        let (owner, repo) = github_pair(identity)?;
        let details = self.repository(identity, owner, repo).await?;

        let (activity, pull_requests, issues) = tokio::join!(
            self.reconciler.resolve_commit_activity(
                move || self.commit_activity(owner, repo),
                move || self.recent_commit_times(owner, repo),
                Utc::now(),
            ),
            self.count_pull_requests(owner, repo),
            self.count_issues(owner, repo),
        );
        let activity = activity?;

        Ok(RepositoryStats {
            commits: activity.commits,
            pull_requests: or_degraded(PLATFORM, "pull requests", pull_requests).total,
            issues: or_degraded(PLATFORM, "issues", issues).total,
            stars: details.stargazers_count,
            forks: details.forks_count,
            commit_activity: activity.buckets,
            activity_source: activity.source,
        })
    }
}

fn github_pair(identity: &RepoIdentity) -> Result<(&str, &str)> {
    match identity {
        RepoIdentity::GitHub { owner, repo } => Ok((owner.as_str(), repo.as_str())),
        other => Err(GitError::IdentityMismatch {
            platform: PLATFORM,
            identity: other.platform(),
        }),
    }
}

fn first_page_params() -> [(&'static str, &'static str); 2] {
    [("state", "all"), ("per_page", "100")]
}

fn map_error(e: octocrab::Error) -> GitError {
    match e {
        octocrab::Error::GitHub { source, .. } => {
            GitError::from_status(PLATFORM, source.status_code.as_u16(), source.message)
        }
        e @ (octocrab::Error::Serde { .. } | octocrab::Error::Json { .. }) => {
            GitError::unexpected(PLATFORM, e)
        }
        e => GitError::transport(PLATFORM, e),
    }
}
