use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use tracing::{instrument, warn};

use crate::{
    http::RestClient,
    metrics::ApiMetrics,
    reconciler::or_degraded,
    service::PlatformClient,
    stats::recent_weekly_buckets,
    AccountProfile, ActivitySource, ClientConfig, GitError, PlatformId, RepoIdentity,
    RepositoryStats, RepositorySummary, Result,
};

mod types;

use types::*;

const PLATFORM: PlatformId = PlatformId::GitLab;

/// GitLab v4 client. GitLab has no weekly commit aggregate, so activity is
/// always rebuilt from the latest page of commits. Issues, stars and forks are
/// not fetched for stats and stay at zero.
#[derive(Debug, Clone)]
pub struct GitlabClient {
    rest: RestClient,
    config: ClientConfig,
}

impl GitlabClient {
    pub fn new(token: String, config: &ClientConfig, metrics: Arc<ApiMetrics>) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(PLATFORM, token, config, metrics)?,
            config: config.clone(),
        })
    }

    async fn recent_commit_times(&self, project: &str) -> Result<Vec<DateTime<Utc>>> {
        let (commits, _): (Vec<GitlabCommit>, _) = self
            .rest
            .get_json(
                &format!("projects/{project}/repository/commits"),
                &[(
                    "per_page",
                    self.config.recent_commit_sample.clamp(1, 100).to_string(),
                )],
            )
            .await?;
        Ok(commits.iter().filter_map(GitlabCommit::time).collect())
    }

    async fn count_merge_requests(&self, project: &str) -> Result<u64> {
        let (merge_requests, _): (Vec<GitlabMergeRequest>, _) = self
            .rest
            .get_json(
                &format!("projects/{project}/merge_requests"),
                &[("state", "all".to_string()), ("per_page", "100".to_string())],
            )
            .await?;
        Ok(merge_requests.len() as u64)
    }
}

#[async_trait]
impl PlatformClient for GitlabClient {
    fn platform(&self) -> PlatformId {
        PLATFORM
    }

    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<AccountProfile> {
        let (user, _): (GitlabUser, _) = self.rest.get_json("user", &[]).await?;
        Ok(user.into())
    }

    #[instrument(skip(self))]
    async fn list_repositories(&self) -> Result<Vec<RepositorySummary>> {
        let mut repositories = Vec::new();
        let mut next_page = Some("1".to_string());
        let mut fetched_pages = 0;

        while let Some(page) = next_page {
            if fetched_pages >= self.config.max_repository_pages {
                warn!(
                    pages = fetched_pages,
                    "repository listing truncated at the page limit"
                );
                break;
            }
            let (projects, headers): (Vec<GitlabProject>, _) = self
                .rest
                .get_json(
                    "projects",
                    &[
                        ("membership", "true".to_string()),
                        ("order_by", "last_activity_at".to_string()),
                        ("per_page", self.config.page_size().to_string()),
                        ("page", page),
                    ],
                )
                .await?;
            fetched_pages += 1;
            repositories.extend(projects.into_iter().map(RepositorySummary::from));
            next_page = next_page_header(&headers);
        }

        Ok(crate::repository::dedup_by_full_name(repositories))
    }

    #[instrument(skip(self))]
    async fn get_repository_stats(&self, identity: &RepoIdentity) -> Result<RepositoryStats> {
        let RepoIdentity::GitLab { project_id } = identity else {
            return Err(GitError::IdentityMismatch {
                platform: PLATFORM,
                identity: identity.platform(),
            });
        };
        let project = encode_project_id(project_id);

        let (commits, merge_requests) = tokio::join!(
            self.recent_commit_times(&project),
            self.count_merge_requests(&project),
        );
        let commits = commits.map_err(|e| match e {
            GitError::NotFound { platform, .. } => GitError::NotFound {
                platform,
                resource: project_id.clone(),
            },
            e => e,
        })?;

        Ok(RepositoryStats {
            commits: commits.len() as u64,
            pull_requests: or_degraded(PLATFORM, "merge requests", merge_requests),
            issues: 0,
            stars: 0,
            forks: 0,
            commit_activity: recent_weekly_buckets(&commits, Utc::now(), self.config.recent_weeks),
            activity_source: ActivitySource::Reconstructed,
        })
    }
}

/// Numeric ids pass through; `group/project` paths are percent-encoded into a
/// single path segment.
fn encode_project_id(project_id: &str) -> String {
    url::form_urlencoded::byte_serialize(project_id.as_bytes()).collect()
}

/// GitLab sends an empty `x-next-page` on the last page.
fn next_page_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-next-page")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
