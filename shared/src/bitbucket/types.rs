use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{AccountProfile, PlatformId, RepositorySummary};

/// Bitbucket's paginated envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketPage<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    /// Absolute URL of the next page.
    #[serde(default)]
    pub next: Option<String>,
    /// Total item count; only present on some listings.
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BitbucketLinks {
    #[serde(default)]
    pub html: Option<BitbucketLink>,
    #[serde(default)]
    pub avatar: Option<BitbucketLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketLink {
    pub href: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketUser {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub links: BitbucketLinks,
}

impl From<BitbucketUser> for AccountProfile {
    fn from(user: BitbucketUser) -> Self {
        Self {
            platform: PlatformId::Bitbucket,
            login: user
                .username
                .or(user.nickname)
                .or_else(|| user.display_name.clone())
                .unwrap_or_default(),
            name: user.display_name,
            avatar_url: user.links.avatar.map(|link| link.href),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketBranch {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketRepository {
    pub uuid: String,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub links: BitbucketLinks,
    #[serde(default)]
    pub mainbranch: Option<BitbucketBranch>,
    #[serde(default)]
    pub updated_on: Option<DateTime<Utc>>,
}

impl From<BitbucketRepository> for RepositorySummary {
    fn from(repo: BitbucketRepository) -> Self {
        let url = repo
            .links
            .html
            .map(|link| link.href)
            .unwrap_or_else(|| format!("https://bitbucket.org/{}", repo.full_name));
        // No stars on Bitbucket; forks would need another request per repository.
        Self {
            id: repo.uuid,
            name: repo.name,
            full_name: repo.full_name,
            description: repo.description.filter(|d| !d.is_empty()),
            is_private: repo.is_private,
            url,
            default_branch: repo.mainbranch.map(|branch| branch.name),
            stars: 0,
            forks: 0,
            updated_at: repo.updated_on,
            platform: PlatformId::Bitbucket,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketCommit {
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}
