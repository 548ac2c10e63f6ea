use thiserror::Error;

use crate::PlatformId;

pub type Result<T, E = GitError> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GitError {
    #[error("{} rejected the credential: {message}", .platform.display_name())]
    Authentication { platform: PlatformId, message: String },
    #[error("{} API rate limit exceeded. Please try again later", .platform.display_name())]
    RateLimit { platform: PlatformId, message: String },
    #[error("request to {} failed: {message}", .platform.display_name())]
    Transport { platform: PlatformId, message: String },
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
    #[error("{} resource not found: {resource}", .platform.display_name())]
    NotFound { platform: PlatformId, resource: String },
    #[error("{} client cannot resolve a {} repository identity", .platform.display_name(), .identity.display_name())]
    IdentityMismatch {
        platform: PlatformId,
        identity: PlatformId,
    },
    #[error("invalid repository reference: {0}")]
    InvalidRepository(String),
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    #[error("unexpected response from {}: {message}", .platform.display_name())]
    UnexpectedResponse { platform: PlatformId, message: String },
    /// Soft failure of a sub-fetch. Logged where it happens, never returned
    /// from a top-level call.
    #[error("partial data from {}: {what} unavailable ({message})", .platform.display_name())]
    PartialData {
        platform: PlatformId,
        what: &'static str,
        message: String,
    },
}

impl GitError {
    /// Maps a non-success HTTP status to the error taxonomy. `message` is the
    /// platform's own error text, if any.
    pub fn from_status(platform: PlatformId, status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => GitError::Authentication { platform, message },
            429 => GitError::RateLimit { platform, message },
            403 if message.to_ascii_lowercase().contains("rate limit") => {
                GitError::RateLimit { platform, message }
            }
            403 => GitError::Authentication { platform, message },
            404 => GitError::NotFound {
                platform,
                resource: message,
            },
            _ => GitError::Transport {
                platform,
                message: format!("HTTP {status}: {message}"),
            },
        }
    }

    pub fn transport(platform: PlatformId, message: impl ToString) -> Self {
        GitError::Transport {
            platform,
            message: message.to_string(),
        }
    }

    pub fn unexpected(platform: PlatformId, message: impl ToString) -> Self {
        GitError::UnexpectedResponse {
            platform,
            message: message.to_string(),
        }
    }

    /// Errors that no retry or fallback can fix for the same credential.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            GitError::Authentication { .. } | GitError::RateLimit { .. }
        )
    }

    pub const fn is_rate_limit(&self) -> bool {
        matches!(self, GitError::RateLimit { .. })
    }

    pub fn into_partial(self, platform: PlatformId, what: &'static str) -> Self {
        GitError::PartialData {
            platform,
            what,
            message: self.to_string(),
        }
    }
}
