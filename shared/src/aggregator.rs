use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use futures::{stream, StreamExt};
use tracing::{debug, instrument, warn};

use crate::{
    service::{ConnectionRepositories, PlatformClient},
    CalendarBuilder, ContributionCalendar, RepositorySummary,
};

/// Folds the weekly activity of many repositories into one daily calendar.
///
/// Up to `concurrency` stats requests are in flight at once. A repository
/// whose stats cannot be fetched is logged and left out. Dropping the returned
/// future abandons every request still in flight.
#[derive(Debug, Clone, Copy)]
pub struct ContributionAggregator {
    concurrency: usize,
}

impl Default for ContributionAggregator {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

impl ContributionAggregator {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub async fn aggregate(&self, connections: &[ConnectionRepositories]) -> ContributionCalendar {
        self.aggregate_at(connections, Utc::now().date_naive()).await
    }

    #[instrument(skip_all, fields(today = %today))]
    pub async fn aggregate_at(
        &self,
        connections: &[ConnectionRepositories],
        today: NaiveDate,
    ) -> ContributionCalendar {
        let jobs = connections.iter().flat_map(|connection| {
            connection
                .repositories
                .iter()
                .map(move |repository| (&connection.client, repository))
        });

        let mut results = stream::iter(jobs)
            .map(|(client, repository)| fetch_activity(client, repository))
            .buffer_unordered(self.concurrency);

        let mut builder = CalendarBuilder::new(today);
        let mut included = 0usize;
        while let Some(activity) = results.next().await {
            if let Some(buckets) = activity {
                builder.add_weekly_activity(&buckets);
                included += 1;
            }
        }

        let calendar = builder.build();
        debug!(
            repositories = included,
            total = calendar.total_contributions,
            "contribution calendar built"
        );
        calendar
    }
}

async fn fetch_activity(
    client: &Arc<dyn PlatformClient>,
    repository: &RepositorySummary,
) -> Option<Vec<crate::WeeklyCommitBucket>> {
    let identity = match repository.identity() {
        Ok(identity) => identity,
        Err(e) => {
            warn!(repository = %repository.full_name, "skipping repository: {e}");
            return None;
        }
    };
    match client.get_repository_stats(&identity).await {
        Ok(stats) => Some(stats.commit_activity),
        Err(e) => {
            warn!(repository = %repository.full_name, "skipping repository: {e}");
            None
        }
    }
}
