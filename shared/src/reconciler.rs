use std::{future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
    metrics::{ApiMetrics, FallbackPath},
    stats::{empty_activity, reconstruct_weekly_buckets, total_commits},
    ActivitySource, ClientConfig, GitError, PlatformId, WeeklyCommitBucket,
};

/// One answer from an endpoint whose result the platform computes
/// asynchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeActivity<T = Vec<WeeklyCommitBucket>> {
    Ready(T),
    /// The platform accepted the request but is still computing the aggregate.
    Computing,
}

impl<T> NativeActivity<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> NativeActivity<U> {
        match self {
            NativeActivity::Ready(value) => NativeActivity::Ready(f(value)),
            NativeActivity::Computing => NativeActivity::Computing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedActivity {
    pub commits: u64,
    pub buckets: Vec<WeeklyCommitBucket>,
    pub source: ActivitySource,
}

impl ResolvedActivity {
    pub fn native(buckets: Vec<WeeklyCommitBucket>) -> Self {
        Self {
            commits: total_commits(&buckets),
            buckets,
            source: ActivitySource::Native,
        }
    }

    /// `commits` is the number of dated commits in the sample. It understates
    /// the history of any repository with more commits than were sampled, and
    /// excludes sampled commits that carry no date at all.
    pub fn reconstructed(commit_times: &[DateTime<Utc>], now: DateTime<Utc>, weeks: usize) -> Self {
        if commit_times.is_empty() {
            return Self {
                commits: 0,
                buckets: empty_activity(now, weeks),
                source: ActivitySource::Reconstructed,
            };
        }
        Self {
            commits: commit_times.len() as u64,
            buckets: reconstruct_weekly_buckets(commit_times),
            source: ActivitySource::Reconstructed,
        }
    }

    pub fn unavailable(now: DateTime<Utc>, weeks: usize) -> Self {
        Self {
            commits: 0,
            buckets: empty_activity(now, weeks),
            source: ActivitySource::Unavailable,
        }
    }
}

/// Resolves weekly commit activity for platforms that compute it server-side.
#[derive(Debug, Clone)]
pub struct Reconciler {
    platform: PlatformId,
    attempts: u32,
    backoff: Duration,
    empty_weeks: usize,
    metrics: Arc<ApiMetrics>,
}

impl Reconciler {
    pub fn new(platform: PlatformId, config: &ClientConfig, metrics: Arc<ApiMetrics>) -> Self {
        Self {
            platform,
            attempts: config.stats_retry_attempts.max(1),
            backoff: config.retry_backoff(),
            empty_weeks: config.recent_weeks,
            metrics,
        }
    }

    /// Polls `native` while it reports `Computing`, sleeping `backoff` between
    /// attempts. A rate-limit or authentication error aborts immediately.
    /// Returns `None` once the attempts are spent.
    pub async fn poll_computed<T, N, NFut>(
        &self,
        what: &'static str,
        mut native: N,
    ) -> Result<Option<T>, GitError>
    where
        N: FnMut() -> NFut,
        NFut: Future<Output = Result<NativeActivity<T>, GitError>>,
    {
        for attempt in 1..=self.attempts {
            match native().await {
                Ok(NativeActivity::Ready(value)) => return Ok(Some(value)),
                Ok(NativeActivity::Computing) => {
                    debug!(attempt, what, "still being computed");
                    if attempt < self.attempts {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(attempt, "{what} request failed: {e}"),
            }
        }
        Ok(None)
    }

    /// Resolves weekly activity through [`Self::poll_computed`]. Once the
    /// attempts are spent, weekly buckets are rebuilt from `recent_commits`;
    /// if that fails too, a zero-filled window is returned instead of an error.
    pub async fn resolve_commit_activity<N, NFut, C, CFut>(
        &self,
        native: N,
        recent_commits: C,
        now: DateTime<Utc>,
    ) -> Result<ResolvedActivity, GitError>
    where
        N: FnMut() -> NFut,
        NFut: Future<Output = Result<NativeActivity, GitError>>,
        C: FnOnce() -> CFut,
        CFut: Future<Output = Result<Vec<DateTime<Utc>>, GitError>>,
    {
        if let Some(buckets) = self.poll_computed("commit activity", native).await? {
            return Ok(ResolvedActivity::native(buckets));
        }

        info!(
            attempts = self.attempts,
            "commit activity unavailable, rebuilding from recent commits"
        );
        match recent_commits().await {
            Ok(times) => {
                let resolved = ResolvedActivity::reconstructed(&times, now, self.empty_weeks);
                debug!(
                    commits = resolved.commits,
                    weeks = resolved.buckets.len(),
                    "reconstructed weekly buckets"
                );
                self.metrics
                    .record_fallback(self.platform, FallbackPath::Reconstructed);
                Ok(resolved)
            }
            Err(e) => {
                warn!("{}", e.into_partial(self.platform, "commit history"));
                self.metrics
                    .record_fallback(self.platform, FallbackPath::Unavailable);
                Ok(ResolvedActivity::unavailable(now, self.empty_weeks))
            }
        }
    }
}

/// Unwraps a sub-fetch, degrading failures to the default value.
pub(crate) fn or_degraded<T: Default>(
    platform: PlatformId,
    what: &'static str,
    result: Result<T, GitError>,
) -> T {
    result.unwrap_or_else(|e| {
        warn!("{}", e.into_partial(platform, what));
        T::default()
    })
}
