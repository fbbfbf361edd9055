//! Remote AI session model.
//!
//! A session is a transient handle on one invocation of the remote AI service.
//! It is created with a prompt, polled until it reaches a terminal
//! [`SessionStatus`], and then discarded; nothing about it is persisted.

use serde::{Deserialize, Serialize};

use crate::{RepositoryUrl, SessionId};

/// Lifecycle state of a remote session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepted but not yet working.
    Pending,
    /// The remote agent is working.
    Running,
    /// The remote agent stopped and its output can be read.
    Completed,
    /// The remote agent gave up or the session expired.
    Failed,
}

impl SessionStatus {
    /// Maps the remote service's `status_enum` string onto a [`SessionStatus`].
    ///
    /// A session that is `blocked` is waiting for user input, which for this
    /// system means it has finished its task.
    pub fn from_remote(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "working" | "running" | "resumed" => Self::Running,
            "blocked" | "stopped" | "finished" | "completed" => Self::Completed,
            "failed" | "expired" | "error" => Self::Failed,
            _ => Self::Pending,
        }
    }

    /// `true` for [`Completed`](Self::Completed) and [`Failed`](Self::Failed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Payload used to open a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositoryUrl>,
}

impl SessionRequest {
    pub fn new(prompt: impl Into<String>, repository: Option<&RepositoryUrl>) -> Self {
        Self {
            prompt: prompt.into(),
            repository: repository.cloned(),
        }
    }
}

/// Returned when a session is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub id: SessionId,
    /// Web URL where a human can watch the session, when the service provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Who authored a session message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Written by the remote agent.
    Agent,
    /// Written by the user (including the initial prompt).
    User,
    /// Anything else (system notices, unknown types).
    Other,
}

/// One message in a session transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub kind: MessageKind,
    pub text: String,
}

/// A file the remote agent attached to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub uuid: String,
    pub name: String,
    pub url: String,
}

impl Attachment {
    /// `true` if the attachment is a JSON file whose name starts with `stem`.
    pub fn is_json_named(&self, stem: &str) -> bool {
        let name = self.name.to_ascii_lowercase();
        name.ends_with(".json") && name.starts_with(&stem.to_ascii_lowercase())
    }
}

/// Snapshot of a session as returned by one poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetails {
    pub id: SessionId,
    pub status: SessionStatus,
    /// The raw status string reported by the service.
    pub remote_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_output: Option<serde_json::Value>,
    #[serde(default)]
    pub messages: Vec<SessionMessage>,
    /// Attachments referenced by messages or the structured output,
    /// deduplicated by uuid.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request_url: Option<String>,
}

impl SessionDetails {
    /// Agent messages, most recent first.
    pub fn agent_messages_newest_first(&self) -> impl Iterator<Item = &SessionMessage> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.kind == MessageKind::Agent)
    }
}
