use std::{fmt, sync::Arc};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{info, instrument};

use crate::{
    bitbucket::BitbucketClient, github::GithubClient, gitlab::GitlabClient, metrics::ApiMetrics,
    AccountProfile, ClientConfig, Credential, GitError, PlatformId, RepoIdentity, RepositoryStats,
    RepositorySummary, Result,
};

/// Read-only view of one platform, as seen through one credential.
///
/// Every implementation returns the same shapes; only the identity accepted by
/// [`PlatformClient::get_repository_stats`] differs, and handing a client the
/// identity of another platform fails with `IdentityMismatch`.
#[async_trait]
pub trait PlatformClient: Send + Sync + fmt::Debug {
    fn platform(&self) -> PlatformId;

    /// The account the credential belongs to. Also the cheapest way to check
    /// that a token is valid.
    async fn current_user(&self) -> Result<AccountProfile>;

    /// Every repository visible to the credential, pagination drained up to
    /// the configured page limit.
    async fn list_repositories(&self) -> Result<Vec<RepositorySummary>>;

    async fn get_repository_stats(&self, identity: &RepoIdentity) -> Result<RepositoryStats>;
}

/// A client together with the repositories it listed.
#[derive(Debug, Clone)]
pub struct ConnectionRepositories {
    pub client: Arc<dyn PlatformClient>,
    pub repositories: Vec<RepositorySummary>,
}

/// Builds platform clients. Clients are not cached; callers keep the returned
/// `Arc` if they want to reuse one.
#[derive(Debug, Clone, Default)]
pub struct GitService {
    config: ClientConfig,
    metrics: Arc<ApiMetrics>,
}

impl GitService {
    pub fn new(config: ClientConfig, metrics: Arc<ApiMetrics>) -> Self {
        Self { config, metrics }
    }

    /// Client for `platform` with default configuration. Fails with
    /// `UnsupportedPlatform` for anything but GitHub, GitLab and Bitbucket.
    pub fn create(platform: &str, token: impl Into<String>) -> Result<Arc<dyn PlatformClient>> {
        Self::default().client(&Credential::new(PlatformId::parse(platform)?, token))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<ApiMetrics> {
        &self.metrics
    }

    pub fn client(&self, credential: &Credential) -> Result<Arc<dyn PlatformClient>> {
        let token = credential.token.clone();
        let metrics = self.metrics.clone();
        let client: Arc<dyn PlatformClient> = match credential.platform {
            PlatformId::GitHub => Arc::new(GithubClient::new(token, &self.config, metrics)?),
            PlatformId::GitLab => Arc::new(GitlabClient::new(token, &self.config, metrics)?),
            PlatformId::Bitbucket => Arc::new(BitbucketClient::new(token, &self.config, metrics)?),
        };
        Ok(client)
    }

    /// Builds a client and verifies the credential against the platform.
    #[instrument(skip(self))]
    pub async fn connect(
        &self,
        credential: &Credential,
    ) -> Result<(Arc<dyn PlatformClient>, AccountProfile)> {
        let client = self.client(credential)?;
        let profile = client.current_user().await?;
        info!(platform = %credential.platform, login = %profile.login, "connected");
        Ok((client, profile))
    }

    /// Lists repositories for every credential concurrently. The output has one
    /// entry per credential, in input order, so one failing connection does not
    /// hide the others.
    #[instrument(skip_all, fields(connections = credentials.len()))]
    pub async fn list_repositories_for(
        &self,
        credentials: &[Credential],
    ) -> Vec<Result<ConnectionRepositories>> {
        join_all(credentials.iter().map(|credential| async move {
            let client = self.client(credential)?;
            let repositories = client.list_repositories().await?;
            Ok::<_, GitError>(ConnectionRepositories {
                client,
                repositories,
            })
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IntoEnumIterator;

    #[tokio::test]
    async fn creates_a_client_per_platform() {
        for platform in PlatformId::iter() {
            let client = GitService::create(&platform.to_string(), "token").unwrap();
            assert_eq!(client.platform(), platform);
        }
        let client = GitService::create("gitlab", "token").unwrap();
        assert_eq!(client.platform(), PlatformId::GitLab);
    }

    #[tokio::test]
    async fn rejects_unknown_platforms() {
        let err = GitService::create("GITEA", "token").unwrap_err();
        assert_eq!(err, GitError::UnsupportedPlatform("GITEA".to_string()));
    }

    #[tokio::test]
    async fn clients_reject_foreign_identities() {
        let client = GitService::create("GITLAB", "token").unwrap();
        let err = client
            .get_repository_stats(&RepoIdentity::GitHub {
                owner: "octo".into(),
                repo: "hello".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GitError::IdentityMismatch {
                platform: PlatformId::GitLab,
                identity: PlatformId::GitHub,
            }
        );
    }
}
