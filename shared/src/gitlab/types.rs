use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{AccountProfile, PlatformId, RepositorySummary};

#[derive(Debug, Clone, Deserialize)]
pub struct GitlabUser {
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl From<GitlabUser> for AccountProfile {
    fn from(user: GitlabUser) -> Self {
        Self {
            platform: PlatformId::GitLab,
            login: user.username,
            name: user.name,
            avatar_url: user.avatar_url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitlabProject {
    pub id: u64,
    pub name: String,
    pub path_with_namespace: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `private`, `internal` or `public`.
    #[serde(default)]
    pub visibility: Option<String>,
    pub web_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub star_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl From<GitlabProject> for RepositorySummary {
    fn from(project: GitlabProject) -> Self {
        Self {
            id: project.id.to_string(),
            name: project.name,
            full_name: project.path_with_namespace,
            description: project.description.filter(|d| !d.is_empty()),
            is_private: project.visibility.as_deref() != Some("public"),
            url: project.web_url,
            default_branch: project.default_branch,
            stars: project.star_count,
            forks: project.forks_count,
            updated_at: project.last_activity_at,
            platform: PlatformId::GitLab,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitlabCommit {
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub committed_date: Option<DateTime<Utc>>,
}

impl GitlabCommit {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.created_at.or(self.committed_date)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitlabMergeRequest {
    pub iid: u64,
}
