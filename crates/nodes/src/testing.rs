//! Scripted fakes of the port traits.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use pipeline::{
    AnalyzerError, Attachment, CacheKey, Issue, IssueNumber, IssueSource, MessageKind,
    RepositoryUrl, ResultCache, SessionApi, SessionDetails, SessionHandle, SessionId,
    SessionMessage, SessionRequest, SessionStatus,
};
use serde_json::Value;

/// How a scripted session behaves once created.
#[derive(Debug, Clone)]
pub(crate) struct Script {
    running_polls: usize,
    status: SessionStatus,
    structured_output: Option<Value>,
    messages: Vec<SessionMessage>,
    attachments: Vec<Attachment>,
    pull_request_url: Option<String>,
}

impl Script {
    fn completed() -> Self {
        Self {
            running_polls: 0,
            status: SessionStatus::Completed,
            structured_output: None,
            messages: Vec::new(),
            attachments: Vec::new(),
            pull_request_url: None,
        }
    }

    /// Completes with `value` as structured output.
    pub(crate) fn output(value: Value) -> Self {
        Self {
            structured_output: Some(value),
            ..Self::completed()
        }
    }

    /// Completes with a single agent message.
    pub(crate) fn message(text: &str) -> Self {
        Self::completed().with_message(text)
    }

    pub(crate) fn failed() -> Self {
        Self {
            status: SessionStatus::Failed,
            ..Self::completed()
        }
    }

    /// Never leaves the running state.
    pub(crate) fn hang() -> Self {
        Self {
            running_polls: usize::MAX,
            ..Self::completed()
        }
    }

    pub(crate) fn after_polls(mut self, polls: usize) -> Self {
        self.running_polls = polls;
        self
    }

    pub(crate) fn with_message(mut self, text: &str) -> Self {
        self.messages.push(SessionMessage {
            kind: MessageKind::Agent,
            text: text.to_string(),
        });
        self
    }

    pub(crate) fn with_attachment(mut self, uuid: &str, name: &str) -> Self {
        self.attachments.push(Attachment {
            uuid: uuid.to_string(),
            name: name.to_string(),
            url: format!("https://api.devin.ai/attachments/{uuid}/{name}"),
        });
        self
    }

    pub(crate) fn with_pull_request(mut self, url: &str) -> Self {
        self.pull_request_url = Some(url.to_string());
        self
    }
}

/// [`SessionApi`] whose sessions follow a [`Script`] chosen by the first line
/// of the prompt.
#[derive(Default)]
pub(crate) struct FakeSessionApi {
    rules: Vec<(String, Script)>,
    downloads: HashMap<String, String>,
    sessions: Mutex<HashMap<String, (Script, usize)>>,
    prompts: Mutex<Vec<String>>,
    polls: Mutex<usize>,
}

impl FakeSessionApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sessions whose prompt header contains `marker` follow `script`.
    pub(crate) fn on(mut self, marker: &str, script: Script) -> Self {
        self.rules.push((marker.to_string(), script));
        self
    }

    pub(crate) fn with_download(mut self, uuid: &str, content: &str) -> Self {
        self.downloads.insert(uuid.to_string(), content.to_string());
        self
    }

    /// Every prompt sent, in creation order.
    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Number of prompts whose header contains `marker`.
    pub(crate) fn sessions_matching(&self, marker: &str) -> usize {
        self.prompts()
            .iter()
            .filter(|p| header(p).contains(marker))
            .count()
    }

    pub(crate) fn polls(&self) -> usize {
        *self.polls.lock().unwrap()
    }
}

fn header(prompt: &str) -> &str {
    prompt.lines().next().unwrap_or_default()
}

#[async_trait]
impl SessionApi for FakeSessionApi {
    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<SessionHandle, AnalyzerError> {
        let script = self
            .rules
            .iter()
            .find(|(marker, _)| header(&request.prompt).contains(marker.as_str()))
            .map(|(_, script)| script.clone())
            .ok_or_else(|| AnalyzerError::upstream("no scripted session for prompt"))?;

        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(request.prompt.clone());
        let id = format!("s-{}", prompts.len());
        self.sessions
            .lock()
            .unwrap()
            .insert(id.clone(), (script, 0));

        Ok(SessionHandle {
            id: SessionId::new(id.clone()).unwrap(),
            url: Some(format!("https://app.devin.ai/sessions/{id}")),
        })
    }

    async fn get_session(&self, id: &SessionId) -> Result<SessionDetails, AnalyzerError> {
        *self.polls.lock().unwrap() += 1;
        let mut sessions = self.sessions.lock().unwrap();
        let (script, polls) = sessions
            .get_mut(id.as_str())
            .ok_or_else(|| AnalyzerError::not_found(format!("session {id}")))?;
        *polls += 1;

        if *polls <= script.running_polls {
            return Ok(SessionDetails {
                id: id.clone(),
                status: SessionStatus::Running,
                remote_status: "working".into(),
                structured_output: None,
                messages: Vec::new(),
                attachments: Vec::new(),
                pull_request_url: None,
            });
        }

        Ok(SessionDetails {
            id: id.clone(),
            status: script.status,
            remote_status: match script.status {
                SessionStatus::Failed => "failed".into(),
                _ => "finished".into(),
            },
            structured_output: script.structured_output.clone(),
            messages: script.messages.clone(),
            attachments: script.attachments.clone(),
            pull_request_url: script.pull_request_url.clone(),
        })
    }

    async fn download_attachment(&self, attachment: &Attachment) -> Result<String, AnalyzerError> {
        self.downloads
            .get(&attachment.uuid)
            .cloned()
            .ok_or_else(|| AnalyzerError::upstream(format!("attachment {} missing", attachment.uuid)))
    }
}

/// [`IssueSource`] returning a fixed list and counting calls.
#[derive(Default)]
pub(crate) struct FakeIssueSource {
    issues: Vec<Issue>,
    calls: Mutex<usize>,
}

impl FakeIssueSource {
    pub(crate) fn new(issues: Vec<Issue>) -> Self {
        Self {
            issues,
            calls: Mutex::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl IssueSource for FakeIssueSource {
    async fn list_issues(&self, _repo: &RepositoryUrl) -> Result<Vec<Issue>, AnalyzerError> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.issues.clone())
    }
}

/// In-memory [`ResultCache`].
#[derive(Default)]
pub(crate) struct MemoryCache {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryCache {
    pub(crate) fn get(&self, key: &CacheKey) -> Option<Value> {
        self.entries.lock().unwrap().get(&key.to_string()).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn load(&self, key: &CacheKey) -> Result<Option<Value>, AnalyzerError> {
        Ok(self.get(key))
    }

    async fn store(&self, key: &CacheKey, value: &Value) -> Result<(), AnalyzerError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.clone());
        Ok(())
    }
}

pub(crate) fn repo() -> RepositoryUrl {
    RepositoryUrl::parse("https://github.com/octocat/hello").unwrap()
}

pub(crate) fn issue(number: u64, title: &str) -> Issue {
    Issue {
        number: IssueNumber::new(number),
        title: title.to_string(),
        body: format!("Body of issue {number}"),
        state: "open".into(),
        created_at: None,
        updated_at: None,
        labels: vec![],
    }
}
