//! Request handlers for the HTTP API.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use nodes::{IssueAnalysisResult, IssueListing};
use pipeline::{AnalysisReport, AnalyzerError, ExecutionOutcome, IssueNumber, RepositoryUrl};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../assets/index.html");

// --- Errors ---

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable kind, e.g. `not_found` or `timeout`.
    pub error: String,
    pub detail: Option<String>,
}

/// An [`AnalyzerError`] on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AnalyzerError);

impl From<AnalyzerError> for ApiError {
    fn from(e: AnalyzerError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AnalyzerError::validation(rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AnalyzerError::NotFound { .. } => StatusCode::NOT_FOUND,
            AnalyzerError::Validation { .. } => StatusCode::BAD_REQUEST,
            AnalyzerError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AnalyzerError::UpstreamFailure { .. } => StatusCode::BAD_GATEWAY,
            AnalyzerError::Storage { .. } | AnalyzerError::Configuration { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self.0, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self.0, "request rejected");
        }
        let body = ErrorResponse {
            error: self.0.kind().to_string(),
            detail: Some(self.0.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// --- Request types ---

#[derive(Debug, Deserialize)]
pub struct FetchIssuesRequest {
    pub repo_url: String,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    pub repo_url: String,
    pub issue_id: IssueId,
}

#[derive(Debug, Deserialize)]
pub struct MultipleIssuesRequest {
    pub repo_url: String,
    pub issue_ids: Vec<IssueId>,
}

/// Issue number as sent by the page: a JSON number or a numeric string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssueId {
    Number(u64),
    Text(String),
}

impl IssueId {
    fn parse(&self) -> Result<IssueNumber, AnalyzerError> {
        match self {
            Self::Number(n) => Ok(IssueNumber::new(*n)),
            Self::Text(s) => s.parse(),
        }
    }
}

// --- Response types ---

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct MultipleIssuesResponse {
    pub results: Vec<BatchEntry>,
}

/// One entry of [`MultipleIssuesResponse`], in request order.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Analyzed(IssueAnalysisResult),
    Rejected(RejectedId),
}

/// An id that is not an issue number; echoed back as sent.
#[derive(Debug, Serialize)]
pub struct RejectedId {
    pub issue_id: IssueId,
    pub status: &'static str,
    pub error: String,
    pub kind: &'static str,
}

impl RejectedId {
    fn new(issue_id: IssueId, error: AnalyzerError) -> Self {
        Self {
            issue_id,
            status: "error",
            error: error.to_string(),
            kind: error.kind(),
        }
    }
}

// --- Handlers ---

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn fetch_issues(
    State(state): State<AppState>,
    payload: Result<Json<FetchIssuesRequest>, JsonRejection>,
) -> ApiResult<IssueListing> {
    let Json(req) = payload?;
    let listing = state
        .workflows()
        .fetch_issues(&req.repo_url, req.refresh)
        .await?;
    Ok(Json(listing))
}

pub async fn analyze_issue(
    State(state): State<AppState>,
    payload: Result<Json<IssueRequest>, JsonRejection>,
) -> ApiResult<AnalysisReport> {
    let Json(req) = payload?;
    let issue = req.issue_id.parse()?;
    let report = state
        .workflows()
        .analyze_issue(&req.repo_url, issue)
        .await?;
    Ok(Json(report))
}

pub async fn analyze_multiple_issues(
    State(state): State<AppState>,
    payload: Result<Json<MultipleIssuesRequest>, JsonRejection>,
) -> ApiResult<MultipleIssuesResponse> {
    let Json(req) = payload?;
    RepositoryUrl::parse(&req.repo_url)?;

    let parsed: Vec<_> = req.issue_ids.iter().map(IssueId::parse).collect();
    let valid: Vec<IssueNumber> = parsed.iter().filter_map(|p| p.as_ref().ok().copied()).collect();

    // Empty selections still go through so the workflow can reject them.
    let mut analyzed = if valid.is_empty() && !parsed.is_empty() {
        Vec::new()
    } else {
        state.workflows().analyze_many(&req.repo_url, &valid).await?
    }
    .into_iter();

    let results = req
        .issue_ids
        .into_iter()
        .zip(parsed)
        .filter_map(|(raw, parsed)| match parsed {
            Ok(_) => analyzed.next().map(BatchEntry::Analyzed),
            Err(e) => Some(BatchEntry::Rejected(RejectedId::new(raw, e))),
        })
        .collect();
    Ok(Json(MultipleIssuesResponse { results }))
}

pub async fn execute(
    State(state): State<AppState>,
    payload: Result<Json<IssueRequest>, JsonRejection>,
) -> ApiResult<ExecutionOutcome> {
    let Json(req) = payload?;
    let issue = req.issue_id.parse()?;
    let outcome = state.workflows().execute(&req.repo_url, issue).await?;
    Ok(Json(outcome))
}
