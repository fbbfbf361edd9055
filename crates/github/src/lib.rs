//! GitHub issue source adapter.
//!
//! Implements [`pipeline::IssueSource`] with a direct call to the GitHub REST
//! API (`GET /repos/{owner}/{repo}/issues`). One page of up to 100 open issues
//! is fetched; there is no pagination coordination and no incremental sync.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. Request
//! headers, authentication and status-code translation are handled here; the
//! orchestration layer never sees them.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{AnalyzerError, Issue, IssueNumber, IssueSource, RepositoryUrl};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;

/// Default public endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const PAGE_SIZE: &str = "100";

/// Connection settings for [`GithubClient`].
#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub api_base: String,
    /// Optional token; public repositories work without one at a lower rate limit.
    pub token: Option<String>,
    pub request_timeout: Duration,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// [`IssueSource`] backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> Result<Self, AnalyzerError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("issue-analyzer"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        if let Some(token) = config.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| AnalyzerError::configuration("invalid GitHub token"))?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AnalyzerError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct GithubIssue {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    labels: Vec<GithubLabel>,
    /// Present when the "issue" is actually a pull request.
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GithubLabel {
    Named { name: String },
    Plain(String),
}

impl From<GithubIssue> for Issue {
    fn from(raw: GithubIssue) -> Self {
        Issue {
            number: IssueNumber::new(raw.number),
            title: raw.title,
            body: raw.body.unwrap_or_default(),
            state: raw.state.unwrap_or_else(|| "open".to_string()),
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            labels: raw
                .labels
                .into_iter()
                .map(|l| match l {
                    GithubLabel::Named { name } => name,
                    GithubLabel::Plain(name) => name,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl IssueSource for GithubClient {
    #[tracing::instrument(skip(self, repo), fields(repo = %repo.repository_id()))]
    async fn list_issues(&self, repo: &RepositoryUrl) -> Result<Vec<Issue>, AnalyzerError> {
        let url = format!(
            "{}/repos/{}/{}/issues",
            self.api_base,
            repo.owner(),
            repo.name()
        );
        let response = self
            .http
            .get(url)
            .query(&[("state", "open"), ("per_page", PAGE_SIZE)])
            .send()
            .await
            .map_err(|e| AnalyzerError::upstream(format!("github list issues request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AnalyzerError::not_found(format!(
                "repository {}",
                repo.repository_id()
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::upstream(format!(
                "github list issues failed with status {}: {}",
                status.as_u16(),
                body.chars().take(800).collect::<String>()
            )));
        }

        let raw: Vec<GithubIssue> = response
            .json()
            .await
            .map_err(|e| AnalyzerError::upstream(format!("failed to decode github issues: {e}")))?;

        let issues: Vec<Issue> = raw
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .map(Issue::from)
            .collect();
        tracing::info!(count = issues.len(), "fetched issues from github");
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn client(server: &MockServer, token: Option<&str>) -> GithubClient {
        GithubClient::new(GithubConfig {
            api_base: server.base_url(),
            token: token.map(str::to_string),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn repo() -> RepositoryUrl {
        RepositoryUrl::parse("https://github.com/octocat/hello").unwrap()
    }

    #[tokio::test]
    async fn lists_open_issues_and_skips_pull_requests() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/octocat/hello/issues")
                    .query_param("state", "open")
                    .query_param("per_page", "100")
                    .header("authorization", "Bearer gh-token");
                then.status(200).json_body(json!([
                    {
                        "number": 1,
                        "title": "Crash on start",
                        "body": null,
                        "state": "open",
                        "created_at": "2024-01-01T00:00:00Z",
                        "labels": [{"name": "bug"}]
                    },
                    {
                        "number": 2,
                        "title": "Fix it",
                        "pull_request": {"url": "https://api.github.com/repos/octocat/hello/pulls/2"}
                    }
                ]));
            })
            .await;

        let issues = client(&server, Some("gh-token"))
            .list_issues(&repo())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].number, IssueNumber::new(1));
        assert_eq!(issues[0].body, "");
        assert_eq!(issues[0].labels, vec!["bug".to_string()]);
    }

    #[tokio::test]
    async fn missing_repository_is_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/octocat/hello/issues");
                then.status(404).json_body(json!({"message": "Not Found"}));
            })
            .await;

        let err = client(&server, None).list_issues(&repo()).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn server_error_is_upstream_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/octocat/hello/issues");
                then.status(502).body("bad gateway");
            })
            .await;

        let err = client(&server, None).list_issues(&repo()).await.unwrap_err();
        assert!(err.to_string().contains("502"));
    }
}
