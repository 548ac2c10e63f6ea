use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{GitError, PlatformId, RepoIdentity};

/// One repository visible to a credential. Identity is `(platform, full_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySummary {
    pub id: String,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub is_private: bool,
    pub url: String,
    pub default_branch: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub updated_at: Option<DateTime<Utc>>,
    pub platform: PlatformId,
}

impl RepositorySummary {
    /// The identity `get_repository_stats` expects for this repository.
    pub fn identity(&self) -> Result<RepoIdentity, GitError> {
        match self.platform {
            PlatformId::GitLab => Ok(RepoIdentity::GitLab {
                project_id: self.id.clone(),
            }),
            platform => {
                let (owner, repo) = self
                    .full_name
                    .split_once('/')
                    .ok_or_else(|| GitError::InvalidRepository(self.full_name.clone()))?;
                Ok(RepoIdentity::from_pair(platform, owner, repo))
            }
        }
    }
}

/// Keeps the first occurrence of every `full_name`. Listings sorted by update
/// time can shift items across pages while they are being drained.
pub fn dedup_by_full_name(repositories: Vec<RepositorySummary>) -> Vec<RepositorySummary> {
    repositories
        .into_iter()
        .unique_by(|repo| repo.full_name.clone())
        .collect()
}

/// The account a credential authenticates as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub platform: PlatformId,
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}
