use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

use crate::{GitError, PlatformId};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Outcome {
    Success,
    Computing,
    Authentication,
    RateLimited,
    NotFound,
    Transport,
    Unexpected,
}

impl From<&GitError> for Outcome {
    fn from(e: &GitError) -> Self {
        match e {
            GitError::Authentication { .. } => Outcome::Authentication,
            GitError::RateLimit { .. } => Outcome::RateLimited,
            GitError::NotFound { .. } => Outcome::NotFound,
            GitError::Transport { .. } => Outcome::Transport,
            _ => Outcome::Unexpected,
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum FallbackPath {
    Reconstructed,
    Unavailable,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestRecord {
    pub platform: String,
    pub outcome: Outcome,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct FallbackRecord {
    pub platform: String,
    pub path: FallbackPath,
}

/// Counters for outbound API traffic, shared by every client built from one
/// `GitService`.
#[derive(Debug)]
pub struct ApiMetrics {
    registry: Registry,
    requests: Family<RequestRecord, Counter>,
    fallbacks: Family<FallbackRecord, Counter>,
}

impl Default for ApiMetrics {
    fn default() -> Self {
        let mut registry = Registry::default();
        let requests = Family::default();
        let fallbacks = Family::default();

        registry.register(
            "git_api_requests",
            "Outbound platform API requests by outcome",
            requests.clone(),
        );
        registry.register(
            "commit_activity_fallbacks",
            "Commit activity resolved without the platform's weekly aggregate",
            fallbacks.clone(),
        );

        Self {
            registry,
            requests,
            fallbacks,
        }
    }
}

impl ApiMetrics {
    pub fn record_outcome(&self, platform: PlatformId, outcome: Outcome) {
        self.requests
            .get_or_create(&RequestRecord {
                platform: platform.to_string(),
                outcome,
            })
            .inc();
    }

    pub fn record<T>(&self, platform: PlatformId, result: &Result<T, GitError>) {
        let outcome = match result {
            Ok(_) => Outcome::Success,
            Err(e) => e.into(),
        };
        self.record_outcome(platform, outcome);
    }

    pub fn record_fallback(&self, platform: PlatformId, path: FallbackPath) {
        self.fallbacks
            .get_or_create(&FallbackRecord {
                platform: platform.to_string(),
                path,
            })
            .inc();
    }

    pub fn requests(&self, platform: PlatformId, outcome: Outcome) -> u64 {
        self.requests
            .get_or_create(&RequestRecord {
                platform: platform.to_string(),
                outcome,
            })
            .get()
    }

    pub fn fallbacks(&self, platform: PlatformId, path: FallbackPath) -> u64 {
        self.fallbacks
            .get_or_create(&FallbackRecord {
                platform: platform.to_string(),
                path,
            })
            .get()
    }

    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_requests_by_outcome() {
        let metrics = ApiMetrics::default();
        metrics.record::<()>(PlatformId::GitHub, &Ok(()));
        metrics.record::<()>(
            PlatformId::GitHub,
            &Err(GitError::from_status(PlatformId::GitHub, 429, "")),
        );
        metrics.record_outcome(PlatformId::GitHub, Outcome::Computing);
        metrics.record_outcome(PlatformId::GitHub, Outcome::Computing);

        assert_eq!(metrics.requests(PlatformId::GitHub, Outcome::Success), 1);
        assert_eq!(metrics.requests(PlatformId::GitHub, Outcome::RateLimited), 1);
        assert_eq!(metrics.requests(PlatformId::GitHub, Outcome::Computing), 2);
        assert_eq!(metrics.requests(PlatformId::GitLab, Outcome::Success), 0);
    }

    #[test]
    fn encodes_open_metrics_text() {
        let metrics = ApiMetrics::default();
        metrics.record_fallback(PlatformId::Bitbucket, FallbackPath::Reconstructed);

        let body = metrics.encode().unwrap();
        assert!(body.contains("commit_activity_fallbacks_total"));
        assert!(body.contains("platform=\"BITBUCKET\""));
        assert!(body.contains("path=\"Reconstructed\""));
    }
}
