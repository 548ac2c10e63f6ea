use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::GitError;

pub use strum::IntoEnumIterator;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum PlatformId {
    #[strum(serialize = "GITHUB")]
    #[serde(rename = "GITHUB")]
    GitHub,
    #[strum(serialize = "GITLAB")]
    #[serde(rename = "GITLAB")]
    GitLab,
    #[strum(serialize = "BITBUCKET")]
    #[serde(rename = "BITBUCKET")]
    Bitbucket,
}

impl PlatformId {
    /// Parses a platform name, failing with `UnsupportedPlatform` for anything
    /// outside the closed set.
    pub fn parse(value: &str) -> Result<Self, GitError> {
        Self::from_str(value.trim()).map_err(|_| GitError::UnsupportedPlatform(value.to_string()))
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            PlatformId::GitHub => "GitHub",
            PlatformId::GitLab => "GitLab",
            PlatformId::Bitbucket => "Bitbucket",
        }
    }
}

/// Opaque bearer token for one platform. Never inspected, only forwarded.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub platform: PlatformId,
    pub token: String,
}

impl Credential {
    pub fn new(platform: PlatformId, token: impl Into<String>) -> Self {
        Self {
            platform,
            token: token.into(),
        }
    }
}

// Tokens must never end up in logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("platform", &self.platform)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// `platform=token`, e.g. `gitlab=glpat-xxxx`.
impl FromStr for Credential {
    type Err = GitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (platform, token) = value
            .split_once('=')
            .ok_or_else(|| GitError::InvalidCredential("expected platform=token".to_string()))?;
        let token = token.trim();
        if token.is_empty() {
            return Err(GitError::InvalidCredential(format!(
                "missing token for {}",
                platform.trim()
            )));
        }
        Ok(Self::new(PlatformId::parse(platform)?, token))
    }
}

/// Platform-specific repository identity. Each client only accepts its own variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "platform")]
pub enum RepoIdentity {
    #[serde(rename = "GITHUB")]
    GitHub { owner: String, repo: String },
    #[serde(rename = "GITLAB")]
    GitLab { project_id: String },
    #[serde(rename = "BITBUCKET")]
    Bitbucket { workspace: String, slug: String },
}

impl RepoIdentity {
    pub const fn platform(&self) -> PlatformId {
        match self {
            RepoIdentity::GitHub { .. } => PlatformId::GitHub,
            RepoIdentity::GitLab { .. } => PlatformId::GitLab,
            RepoIdentity::Bitbucket { .. } => PlatformId::Bitbucket,
        }
    }

    /// Accepts `owner/repo`, a GitLab project id or `group/project` path, or a
    /// repository web URL.
    pub fn parse(platform: PlatformId, input: &str) -> Result<Self, GitError> {
        let input = input.trim();
        let path = match url::Url::parse(input) {
            Ok(url) if url.scheme().starts_with("http") => url
                .path_segments()
                .map(|segments| {
                    segments
                        .filter(|s| !s.is_empty())
                        // GitLab web URLs put `-` before tree/blob/merge_requests
                        .take_while(|s| *s != "-")
                        .collect::<Vec<_>>()
                        .join("/")
                })
                .unwrap_or_default(),
            _ => input.trim_matches('/').to_string(),
        };
        let path = path.trim_end_matches(".git");

        if path.is_empty() {
            return Err(GitError::InvalidRepository(input.to_string()));
        }

        match platform {
            PlatformId::GitLab => Ok(RepoIdentity::GitLab {
                project_id: path.to_string(),
            }),
            PlatformId::GitHub | PlatformId::Bitbucket => {
                let mut parts = path.split('/');
                let (Some(owner), Some(repo)) = (parts.next(), parts.next()) else {
                    return Err(GitError::InvalidRepository(input.to_string()));
                };
                if owner.is_empty() || repo.is_empty() {
                    return Err(GitError::InvalidRepository(input.to_string()));
                }
                Ok(Self::from_pair(platform, owner, repo))
            }
        }
    }

    pub(crate) fn from_pair(platform: PlatformId, owner: &str, repo: &str) -> Self {
        match platform {
            PlatformId::Bitbucket => RepoIdentity::Bitbucket {
                workspace: owner.to_string(),
                slug: repo.to_string(),
            },
            _ => RepoIdentity::GitHub {
                owner: owner.to_string(),
                repo: repo.to_string(),
            },
        }
    }
}

impl fmt::Display for RepoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoIdentity::GitHub { owner, repo } => write!(f, "{owner}/{repo}"),
            RepoIdentity::GitLab { project_id } => write!(f, "{project_id}"),
            RepoIdentity::Bitbucket { workspace, slug } => write!(f, "{workspace}/{slug}"),
        }
    }
}
