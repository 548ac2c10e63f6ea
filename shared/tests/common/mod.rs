#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use shared::{metrics::ApiMetrics, ClientConfig, Credential, GitService, PlatformClient, PlatformId};
use wiremock::MockServer;

/// Default configuration pointed at `server`, with a short retry backoff.
pub fn config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        stats_retry_backoff_ms: 10,
        ..ClientConfig::default().with_base_url(server.uri())
    }
}

pub fn service(server: &MockServer) -> (GitService, Arc<ApiMetrics>) {
    let metrics = Arc::new(ApiMetrics::default());
    (GitService::new(config(server), metrics.clone()), metrics)
}

pub fn client(server: &MockServer, platform: PlatformId, token: &str) -> Arc<dyn PlatformClient> {
    service(server)
        .0
        .client(&Credential::new(platform, token))
        .unwrap()
}

/// Commit times `days` before now, newest first like the platforms list them.
pub fn days_ago(days: &[i64]) -> Vec<DateTime<Utc>> {
    let now = Utc::now();
    days.iter().map(|d| now - Duration::days(*d)).collect()
}

pub fn github_repository(id: u64, owner: &str) -> Value {
    json!({
        "id": id,
        "name": format!("repo-{id}"),
        "full_name": format!("{owner}/repo-{id}"),
        "description": null,
        "private": id % 2 == 0,
        "html_url": format!("https://github.com/{owner}/repo-{id}"),
        "default_branch": "main",
        "stargazers_count": id,
        "forks_count": 1,
        "updated_at": "2024-05-01T10:00:00Z"
    })
}

pub fn gitlab_project(id: u64) -> Value {
    json!({
        "id": id,
        "name": format!("project-{id}"),
        "path_with_namespace": format!("group/project-{id}"),
        "description": "",
        "visibility": "private",
        "web_url": format!("https://gitlab.com/group/project-{id}"),
        "default_branch": "main",
        "star_count": 0,
        "forks_count": 0,
        "last_activity_at": "2024-05-01T10:00:00.000Z"
    })
}

pub fn bitbucket_repository(slug: &str) -> Value {
    json!({
        "type": "repository",
        "uuid": format!("{{{slug}}}"),
        "name": slug,
        "full_name": format!("team/{slug}"),
        "description": "",
        "is_private": true,
        "links": {"html": {"href": format!("https://bitbucket.org/team/{slug}")}},
        "mainbranch": {"name": "main", "type": "branch"},
        "updated_on": "2024-04-30T08:15:00.000000+00:00"
    })
}
