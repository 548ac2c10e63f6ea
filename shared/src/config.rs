use std::time::Duration;

use serde::Deserialize;

use crate::PlatformId;

pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const GITLAB_API_URL: &str = "https://gitlab.com/api/v4";
pub const BITBUCKET_API_URL: &str = "https://api.bitbucket.org/2.0";

/// Tunables shared by every platform client. All fields have defaults so the
/// struct can be loaded from a partial environment with `envy`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub github_api_url: String,
    pub gitlab_api_url: String,
    pub bitbucket_api_url: String,
    pub user_agent: String,
    pub request_timeout_ms: u64,
    /// Attempts at the asynchronously computed commit-activity endpoint.
    pub stats_retry_attempts: u32,
    pub stats_retry_backoff_ms: u64,
    pub page_size: u32,
    /// Bounds a repository listing to `page_size * max_repository_pages` items.
    pub max_repository_pages: u32,
    /// Commits sampled when weekly activity has to be rebuilt from raw commits.
    pub recent_commit_sample: u32,
    /// Buckets kept for GitLab/Bitbucket and for the zero-filled placeholder.
    pub recent_weeks: usize,
    /// Repositories fetched in parallel while building a contribution calendar.
    pub aggregation_concurrency: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            github_api_url: GITHUB_API_URL.to_string(),
            gitlab_api_url: GITLAB_API_URL.to_string(),
            bitbucket_api_url: BITBUCKET_API_URL.to_string(),
            user_agent: concat!("git-pulse/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_ms: 5_000,
            stats_retry_attempts: 3,
            stats_retry_backoff_ms: 1_000,
            page_size: 100,
            max_repository_pages: 50,
            recent_commit_sample: 100,
            recent_weeks: 12,
            aggregation_concurrency: 4,
        }
    }
}

impl ClientConfig {
    /// Points every platform at the same base URL. Used against mock servers.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.github_api_url = base_url.clone();
        self.gitlab_api_url = base_url.clone();
        self.bitbucket_api_url = base_url;
        self
    }

    pub fn api_url(&self, platform: PlatformId) -> &str {
        let url = match platform {
            PlatformId::GitHub => &self.github_api_url,
            PlatformId::GitLab => &self.gitlab_api_url,
            PlatformId::Bitbucket => &self.bitbucket_api_url,
        };
        url.trim_end_matches('/')
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.stats_retry_backoff_ms)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.clamp(1, 100)
    }

    pub fn aggregation_concurrency(&self) -> usize {
        self.aggregation_concurrency.max(1)
    }
}
