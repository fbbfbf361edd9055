//! Devin REST payloads and their translation into domain types.
//!
//! The service's JSON is loosely specified, so every field is optional here and
//! the conversion into [`SessionDetails`] fills in sensible defaults.

use std::collections::HashSet;
use std::sync::LazyLock;

use pipeline::{
    AnalyzerError, Attachment, MessageKind, RepositoryUrl, SessionDetails, SessionHandle,
    SessionId, SessionMessage, SessionRequest, SessionStatus,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static ATTACHMENT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"ATTACHMENT:"([^"]+)""#).expect("valid regex"));

static ATTACHMENT_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/attachments/([^/]+)/([^/]+)$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct CreateSessionBody<'a> {
    pub prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
}

impl<'a> CreateSessionBody<'a> {
    pub fn from_request(request: &'a SessionRequest) -> Self {
        Self {
            prompt: &request.prompt,
            repository_url: request.repository.as_ref().map(RepositoryUrl::to_string),
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct CreateSessionResponse {
    pub session_id: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl CreateSessionResponse {
    pub fn into_handle(self) -> Result<SessionHandle, AnalyzerError> {
        let id = SessionId::new(self.session_id)
            .ok_or_else(|| AnalyzerError::upstream("devin returned an empty session_id"))?;
        Ok(SessionHandle { id, url: self.url })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSession {
    #[serde(default)]
    pub status_enum: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub structured_output: Option<Value>,
    #[serde(default)]
    pub messages: Option<Vec<RawMessage>>,
    #[serde(default)]
    pub pull_request: Option<RawPullRequest>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMessage {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPullRequest {
    #[serde(default)]
    pub url: Option<String>,
}

impl RawSession {
    pub fn into_details(self, id: SessionId) -> SessionDetails {
        let remote_status = self
            .status_enum
            .or(self.status)
            .unwrap_or_else(|| "unknown".to_string());
        let status = SessionStatus::from_remote(&remote_status);

        let messages: Vec<SessionMessage> = self
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| SessionMessage {
                kind: match m.kind.as_deref() {
                    Some("devin_message") => MessageKind::Agent,
                    Some("user_message") | Some("initial_user_message") => MessageKind::User,
                    _ => MessageKind::Other,
                },
                text: m.message.unwrap_or_default(),
            })
            .collect();

        let structured_output = self.structured_output.filter(|v| !v.is_null());
        let attachments = collect_attachments(&messages, structured_output.as_ref());
        let pull_request_url = self
            .pull_request
            .and_then(|pr| pr.url)
            .filter(|u| !u.trim().is_empty());

        SessionDetails {
            id,
            status,
            remote_status,
            structured_output,
            messages,
            attachments,
            pull_request_url,
        }
    }
}

/// Gathers attachment references from agent messages (`ATTACHMENT:"<url>"`)
/// and from `structured_output.attachments`, keeping the first occurrence of
/// each uuid.
pub(crate) fn collect_attachments(
    messages: &[SessionMessage],
    structured_output: Option<&Value>,
) -> Vec<Attachment> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    let from_messages = messages
        .iter()
        .filter(|m| m.kind == MessageKind::Agent)
        .flat_map(|m| ATTACHMENT_MARKER.captures_iter(&m.text))
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()));

    let from_output = structured_output
        .and_then(|v| v.get("attachments"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str().map(str::to_string));

    for url in from_messages.chain(from_output) {
        if let Some(attachment) = parse_attachment_url(&url) {
            if seen.insert(attachment.uuid.clone()) {
                out.push(attachment);
            }
        }
    }
    out
}

fn parse_attachment_url(url: &str) -> Option<Attachment> {
    let caps = ATTACHMENT_URL.captures(url)?;
    Some(Attachment {
        uuid: caps.get(1)?.as_str().to_string(),
        name: caps.get(2)?.as_str().to_string(),
        url: url.to_string(),
    })
}
