use std::{fmt, sync::Arc};

use reqwest::{header::HeaderMap, Client, Response};
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::{metrics::ApiMetrics, ClientConfig, GitError, PlatformId};

/// Bearer-authenticated JSON client for platforms reached over plain REST.
#[derive(Clone)]
pub(crate) struct RestClient {
    platform: PlatformId,
    client: Client,
    base_url: String,
    token: String,
    metrics: Arc<ApiMetrics>,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("platform", &self.platform)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    pub fn new(
        platform: PlatformId,
        token: String,
        config: &ClientConfig,
        metrics: Arc<ApiMetrics>,
    ) -> Result<Self, GitError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| GitError::transport(platform, e))?;

        Ok(Self {
            platform,
            client,
            base_url: config.api_url(platform).to_string(),
            token,
            metrics,
        })
    }

    /// Resolves a path against the base URL; absolute URLs (pagination links)
    /// are used as they are.
    pub fn url(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!("{}/{}", self.base_url, path_or_url.trim_start_matches('/'))
        }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path_or_url: &str,
        query: &[(&str, String)],
    ) -> Result<(T, HeaderMap), GitError> {
        let result = self.fetch(path_or_url, query).await;
        self.metrics.record(self.platform, &result);
        result
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path_or_url: &str,
        query: &[(&str, String)],
    ) -> Result<(T, HeaderMap), GitError> {
        let url = self.url(path_or_url);
        trace!(platform = %self.platform, url, "GET");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let response = self.check_status(response).await?;
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        let value =
            serde_json::from_slice(&body).map_err(|e| GitError::unexpected(self.platform, e))?;
        Ok((value, headers))
    }

    async fn check_status(&self, response: Response) -> Result<Response, GitError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GitError::from_status(
            self.platform,
            status.as_u16(),
            error_message(&body).unwrap_or_else(|| status.to_string()),
        ))
    }

    fn transport_error(&self, e: reqwest::Error) -> GitError {
        if e.is_timeout() {
            GitError::transport(self.platform, format!("request timed out: {e}"))
        } else {
            GitError::transport(self.platform, e)
        }
    }
}

/// Pulls a human-readable message out of an error payload. GitLab uses
/// `message` or `error`, Bitbucket nests it under `error.message`.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = value
        .pointer("/error/message")
        .or_else(|| value.get("message"))
        .or_else(|| value.get("error"))?;
    match message {
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
