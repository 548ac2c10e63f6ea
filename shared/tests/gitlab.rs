mod common;

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;
use shared::{
    metrics::{ApiMetrics, Outcome},
    total_commits, week_index, ActivitySource, ClientConfig, Credential, GitError, GitService,
    PlatformId, RepoIdentity,
};
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn project(id: &str) -> RepoIdentity {
    RepoIdentity::GitLab {
        project_id: id.into(),
    }
}

fn commits_json(days: &[i64]) -> serde_json::Value {
    common::days_ago(days)
        .into_iter()
        .map(|date| {
            json!({
                "id": "ed899a2f4b50b4370feeea94676502b42383c746",
                "title": "change",
                "created_at": date.to_rfc3339(),
                "committed_date": date.to_rfc3339()
            })
        })
        .collect()
}

#[tokio::test]
async fn follows_next_page_header() {
    let server = MockServer::start().await;

    let first: Vec<_> = (1..=100).map(common::gitlab_project).collect();
    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(header("authorization", "Bearer glpat-token"))
        .and(query_param("membership", "true"))
        .and(query_param("per_page", "100"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-next-page", "2")
                .set_body_json(first),
        )
        .expect(1)
        .mount(&server)
        .await;

    let second: Vec<_> = (101..=150).map(common::gitlab_project).collect();
    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-next-page", "")
                .set_body_json(second),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&server, PlatformId::GitLab, "glpat-token");
    let repositories = client.list_repositories().await.unwrap();

    assert_eq!(repositories.len(), 150);
    assert_eq!(repositories[0].full_name, "group/project-1");
    assert_eq!(repositories[0].identity().unwrap(), project("1"));
    assert!(repositories.iter().all(|repo| repo.is_private));
    assert!(repositories.iter().all(|repo| repo.platform == PlatformId::GitLab));
}

#[tokio::test]
async fn stops_at_the_page_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-next-page", "2")
                .set_body_json(vec![common::gitlab_project(1)]),
        )
        .expect(2)
        .mount(&server)
        .await;

    let config = shared::ClientConfig {
        max_repository_pages: 2,
        ..common::config(&server)
    };
    let client = shared::GitService::new(config, Default::default())
        .client(&shared::Credential::new(PlatformId::GitLab, "glpat-token"))
        .unwrap();

    // the same project on both pages collapses into one entry
    assert_eq!(client.list_repositories().await.unwrap().len(), 1);
}

#[tokio::test]
async fn rebuilds_activity_from_commits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/42/repository/commits"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(commits_json(&[0, 2, 4, 9, 10])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/42/merge_requests"))
        .and(query_param("state", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"iid": 1}, {"iid": 2}, {"iid": 3}
        ])))
        .mount(&server)
        .await;

    let client = common::client(&server, PlatformId::GitLab, "glpat-token");
    let stats = client.get_repository_stats(&project("42")).await.unwrap();

    assert_eq!(stats.commits, 5);
    assert_eq!(total_commits(&stats.commit_activity), 5);
    assert_eq!(stats.pull_requests, 3);
    assert_eq!((stats.issues, stats.stars, stats.forks), (0, 0, 0));
    assert_eq!(stats.activity_source, ActivitySource::Reconstructed);
    assert_eq!(
        stats.commit_activity.last().unwrap().week_index(),
        week_index(Utc::now().timestamp())
    );
}

#[tokio::test]
async fn keeps_the_twelve_most_recent_weeks() {
    let server = MockServer::start().await;
    let days: Vec<i64> = (0..20).map(|week| week * 7).collect();
    Mock::given(method("GET"))
        .and(path("/projects/group%2Fapp/repository/commits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(commits_json(&days)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/group%2Fapp/merge_requests"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = common::client(&server, PlatformId::GitLab, "glpat-token");
    let stats = client
        .get_repository_stats(&project("group/app"))
        .await
        .unwrap();

    // every sampled commit is counted, only the latest weeks are kept
    assert_eq!(stats.commits, 20);
    assert_eq!(stats.commit_activity.len(), 12);
    assert_eq!(total_commits(&stats.commit_activity), 12);
    // a failed merge request listing degrades to zero
    assert_eq!(stats.pull_requests, 0);
}

#[tokio::test]
async fn empty_project_has_twelve_zero_weeks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/7/repository/commits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/7/merge_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = common::client(&server, PlatformId::GitLab, "glpat-token");
    let stats = client.get_repository_stats(&project("7")).await.unwrap();

    assert_eq!(stats.commits, 0);
    assert_eq!(stats.commit_activity.len(), 12);
    assert_eq!(total_commits(&stats.commit_activity), 0);
}

#[tokio::test]
async fn classifies_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "401 Unauthorized"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Retry later"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/404/repository/commits"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "404 Project Not Found"})),
        )
        .mount(&server)
        .await;

    let client = common::client(&server, PlatformId::GitLab, "glpat-token");

    assert_eq!(
        client.list_repositories().await.unwrap_err(),
        GitError::Authentication {
            platform: PlatformId::GitLab,
            message: "401 Unauthorized".into(),
        }
    );
    assert!(client.current_user().await.unwrap_err().is_rate_limit());
    assert_eq!(
        client.get_repository_stats(&project("404")).await.unwrap_err(),
        GitError::NotFound {
            platform: PlatformId::GitLab,
            resource: "404".into(),
        }
    );
}

#[tokio::test]
async fn current_user_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "username": "jdoe",
            "name": "J Doe",
            "avatar_url": "https://gitlab.com/uploads/avatar.png"
        })))
        .mount(&server)
        .await;

    let client = common::client(&server, PlatformId::GitLab, "glpat-token");
    let profile = client.current_user().await.unwrap();

    assert_eq!(profile.platform, PlatformId::GitLab);
    assert_eq!(profile.login, "jdoe");
    assert_eq!(profile.name.as_deref(), Some("J Doe"));
}

#[tokio::test]
async fn request_timeout_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/7/repository/commits"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(commits_json(&[1]))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let metrics = Arc::new(ApiMetrics::default());
    let config = ClientConfig {
        request_timeout_ms: 200,
        ..common::config(&server)
    };
    let client = GitService::new(config, metrics.clone())
        .client(&Credential::new(PlatformId::GitLab, "glpat-token"))
        .unwrap();

    let err = client.get_repository_stats(&project("7")).await.unwrap_err();

    assert!(
        matches!(err, GitError::Transport { platform: PlatformId::GitLab, .. }),
        "unexpected error: {err:?}"
    );
    assert!(!err.is_fatal());
    assert_eq!(metrics.requests(PlatformId::GitLab, Outcome::Transport), 1);
}
