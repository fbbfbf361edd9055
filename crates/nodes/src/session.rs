//! Session Manager: create a remote session and poll it to a terminal state.

use std::sync::Arc;
use std::time::Duration;

use pipeline::{
    AnalyzerError, Phase, PhaseTimeouts, RepositoryUrl, SessionApi, SessionDetails, SessionId,
    SessionRequest, SessionStatus,
};
use tokio::time::Instant;

/// Poll interval schedule: starts at `initial`, doubles after every poll, and
/// never exceeds `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    /// Interval to use after `current`.
    pub fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

/// Drives remote sessions from creation to a terminal state.
///
/// Cheap to clone; all clones share the same [`SessionApi`].
#[derive(Clone)]
pub struct SessionManager {
    api: Arc<dyn SessionApi>,
    timeouts: PhaseTimeouts,
    backoff: BackoffPolicy,
}

impl SessionManager {
    pub fn new(api: Arc<dyn SessionApi>, timeouts: PhaseTimeouts) -> Self {
        Self {
            api,
            timeouts,
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn api(&self) -> &dyn SessionApi {
        self.api.as_ref()
    }

    /// Opens a session for `phase` and waits for it within that phase's budget.
    ///
    /// Returns the details of the completed session. A session the remote side
    /// reports as failed becomes [`AnalyzerError::UpstreamFailure`]; running out
    /// of budget becomes [`AnalyzerError::Timeout`].
    #[tracing::instrument(skip(self, prompt, repository), fields(phase = %phase))]
    pub async fn run(
        &self,
        phase: Phase,
        prompt: String,
        repository: Option<&RepositoryUrl>,
    ) -> Result<SessionDetails, AnalyzerError> {
        let request = SessionRequest::new(prompt, repository);
        let handle = self.api.create_session(&request).await?;
        tracing::info!(session_id = %handle.id, url = ?handle.url, "session started");
        self.wait_for_completion(&handle.id, self.timeouts.for_phase(phase))
            .await
    }

    /// Polls `id` until it is terminal or `budget` has elapsed.
    pub async fn wait_for_completion(
        &self,
        id: &SessionId,
        budget: Duration,
    ) -> Result<SessionDetails, AnalyzerError> {
        let started = Instant::now();
        let mut delay = self.backoff.initial;
        let mut seen_messages = 0usize;
        let mut last_status = None;

        loop {
            let details = self.api.get_session(id).await?;

            if details.messages.len() < seen_messages {
                seen_messages = 0;
            }
            for message in &details.messages[seen_messages..] {
                tracing::debug!(
                    session_id = %id,
                    kind = ?message.kind,
                    message = %message.text,
                    "session message"
                );
            }
            seen_messages = details.messages.len();

            if last_status != Some(details.status) {
                tracing::debug!(
                    session_id = %id,
                    status = %details.status,
                    remote_status = %details.remote_status,
                    "session status changed"
                );
                last_status = Some(details.status);
            }

            match details.status {
                SessionStatus::Completed => {
                    tracing::info!(
                        session_id = %id,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "session completed"
                    );
                    return Ok(details);
                }
                SessionStatus::Failed => {
                    return Err(AnalyzerError::upstream(format!(
                        "session {id} ended with status '{}'",
                        details.remote_status
                    )));
                }
                SessionStatus::Pending | SessionStatus::Running => {}
            }

            let elapsed = started.elapsed();
            if elapsed >= budget {
                tracing::warn!(session_id = %id, budget_s = budget.as_secs(), "session timed out");
                return Err(AnalyzerError::Timeout {
                    session_id: id.clone(),
                    budget,
                });
            }

            tokio::time::sleep(delay.min(budget - elapsed)).await;
            delay = self.backoff.next(delay);
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("timeouts", &self.timeouts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}
