//! HTTP client for the Devin session API.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{
    AnalyzerError, Attachment, SessionApi, SessionDetails, SessionHandle, SessionId,
    SessionRequest,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;

use crate::wire::{CreateSessionBody, CreateSessionResponse, RawSession};

/// Default public endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.devin.ai/v1";

/// Longest remote error body carried into an [`AnalyzerError`].
const MAX_ERROR_BODY: usize = 800;

/// Connection settings for [`DevinClient`].
#[derive(Debug, Clone)]
pub struct DevinConfig {
    pub api_base: String,
    pub api_key: String,
    /// Per-HTTP-request timeout. Distinct from the phase polling budgets.
    pub request_timeout: Duration,
}

impl DevinConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// [`SessionApi`] implementation backed by the Devin REST API.
#[derive(Debug, Clone)]
pub struct DevinClient {
    http: reqwest::Client,
    api_base: String,
}

impl DevinClient {
    /// Builds a client with bearer authentication baked into every request.
    pub fn new(config: DevinConfig) -> Result<Self, AnalyzerError> {
        let key = config.api_key.trim();
        if key.is_empty() {
            return Err(AnalyzerError::configuration("DEVIN_API_KEY is required"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| AnalyzerError::configuration("invalid Devin API key"))?,
        );

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

    async fn send(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AnalyzerError> {
        let response = request
            .send()
            .await
            .map_err(|e| AnalyzerError::upstream(format!("devin {operation} request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(AnalyzerError::upstream(format!(
            "devin {operation} failed with status {}: {}",
            status.as_u16(),
            truncate(&body, MAX_ERROR_BODY)
        )))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AnalyzerError> {
        self.send(operation, request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| AnalyzerError::upstream(format!("failed to decode devin {operation}: {e}")))
    }
}

#[async_trait]
impl SessionApi for DevinClient {
    #[tracing::instrument(skip(self, request), fields(repo = ?request.repository))]
    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<SessionHandle, AnalyzerError> {
        let body = CreateSessionBody::from_request(request);
        let created: CreateSessionResponse = self
            .send_json(
                "create session",
                self.http.post(format!("{}/sessions", self.api_base)).json(&body),
            )
            .await?;
        let handle = created.into_handle()?;
        tracing::info!(session_id = %handle.id, url = ?handle.url, "created devin session");
        Ok(handle)
    }

    async fn get_session(&self, id: &SessionId) -> Result<SessionDetails, AnalyzerError> {
        let raw: RawSession = self
            .send_json(
                "get session",
                self.http.get(format!("{}/session/{}", self.api_base, id)),
            )
            .await?;
        Ok(raw.into_details(id.clone()))
    }

    async fn download_attachment(&self, attachment: &Attachment) -> Result<String, AnalyzerError> {
        let url = format!(
            "{}/attachments/{}/{}",
            self.api_base, attachment.uuid, attachment.name
        );
        self.send("download attachment", self.http.get(url))
            .await?
            .text()
            .await
            .map_err(|e| AnalyzerError::upstream(format!("failed to read attachment {}: {e}", attachment.name)))
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
