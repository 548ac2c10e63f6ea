use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
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

const PLATFORM: PlatformId = PlatformId::Bitbucket;

const PULL_REQUEST_STATES: [&str; 4] = ["OPEN", "MERGED", "DECLINED", "SUPERSEDED"];

/// Bitbucket Cloud 2.0 client.
#[derive(Debug, Clone)]
pub struct BitbucketClient {
    rest: RestClient,
    config: ClientConfig,
}

impl BitbucketClient {
    pub fn new(token: String, config: &ClientConfig, metrics: Arc<ApiMetrics>) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(PLATFORM, token, config, metrics)?,
            config: config.clone(),
        })
    }

    async fn recent_commit_times(&self, workspace: &str, slug: &str) -> Result<Vec<DateTime<Utc>>> {
        let (page, _): (BitbucketPage<BitbucketCommit>, _) = self
            .rest
            .get_json(
                &format!("repositories/{workspace}/{slug}/commits"),
                &[(
                    "pagelen",
                    self.config.recent_commit_sample.clamp(1, 100).to_string(),
                )],
            )
            .await?;
        Ok(page.values.iter().filter_map(|commit| commit.date).collect())
    }

    /// Reads the envelope's `size`, so one item per page is enough.
    async fn count_pull_requests(&self, workspace: &str, slug: &str) -> Result<u64> {
        let mut query: Vec<_> = PULL_REQUEST_STATES
            .iter()
            .map(|state| ("state", state.to_string()))
            .collect();
        query.push(("pagelen", "1".to_string()));

        let (page, _): (BitbucketPage<serde_json::Value>, _) = self
            .rest
            .get_json(
                &format!("repositories/{workspace}/{slug}/pullrequests"),
                &query,
            )
            .await?;
        page.size
            .ok_or_else(|| GitError::unexpected(PLATFORM, "pull request listing has no size"))
    }
}

#[async_trait]
impl PlatformClient for BitbucketClient {
    fn platform(&self) -> PlatformId {
        PLATFORM
    }

    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<AccountProfile> {
        let (user, _): (BitbucketUser, _) = self.rest.get_json("user", &[]).await?;
        Ok(user.into())
    }

    #[instrument(skip(self))]
    async fn list_repositories(&self) -> Result<Vec<RepositorySummary>> {
        let (mut page, _): (BitbucketPage<BitbucketRepository>, _) = self
            .rest
            .get_json(
                "repositories",
                &[
                    ("role", "member".to_string()),
                    ("sort", "-updated_on".to_string()),
                    ("pagelen", self.config.page_size().to_string()),
                ],
            )
            .await?;

        let mut repositories = Vec::new();
        let mut fetched_pages = 1;
        loop {
            repositories.extend(page.values.drain(..).map(RepositorySummary::from));

            let Some(next) = page.next.take() else {
                break;
            };
            if fetched_pages >= self.config.max_repository_pages {
                warn!(
                    pages = fetched_pages,
                    "repository listing truncated at the page limit"
                );
                break;
            }
            // `next` already carries the query string.
            (page, _) = self.rest.get_json(&next, &[]).await?;
            fetched_pages += 1;
        }

        Ok(crate::repository::dedup_by_full_name(repositories))
    }

    #[instrument(skip(self))]
    async fn get_repository_stats(&self, identity: &RepoIdentity) -> Result<RepositoryStats> {
        let RepoIdentity::Bitbucket { workspace, slug } = identity else {
            return Err(GitError::IdentityMismatch {
                platform: PLATFORM,
                identity: identity.platform(),
            });
        };

        let (commits, pull_requests) = tokio::join!(
            self.recent_commit_times(workspace, slug),
            self.count_pull_requests(workspace, slug),
        );
        let commits = commits.map_err(|e| match e {
            GitError::NotFound { platform, .. } => GitError::NotFound {
                platform,
                resource: identity.to_string(),
            },
            e => e,
        })?;

        Ok(RepositoryStats {
            commits: commits.len() as u64,
            pull_requests: or_degraded(PLATFORM, "pull requests", pull_requests),
            issues: 0,
            stars: 0,
            forks: 0,
            commit_activity: recent_weekly_buckets(&commits, Utc::now(), self.config.recent_weeks),
            activity_source: ActivitySource::Reconstructed,
        })
    }
}
