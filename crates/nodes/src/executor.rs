//! Executor: hands an approved plan to the AI service and records the result.
//!
//! The remote agent does all the Git work (branch, commit, push, pull
//! request). This module only starts the session and reads back what it
//! reports.

use std::sync::LazyLock;

use pipeline::{
    ActionPlan, AnalyzerError, BranchName, CacheKey, ExecutionOutcome, ExecutionStatus,
    FeasibilityResult, IssueNumber, Phase, RepositoryUrl, ResultKind, SessionDetails, Timestamp,
};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::analyzer::Analyzer;
use crate::lenient;
use crate::output::{self, OutputName};
use crate::prompts;

static PULL_REQUEST_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://github\.com/[\w.-]+/[\w.-]+/pull/\d+").expect("valid regex")
});

/// Applies plans through the AI service.
#[derive(Debug, Clone)]
pub struct Executor {
    analyzer: Analyzer,
}

impl Executor {
    pub fn new(analyzer: Analyzer) -> Self {
        Self { analyzer }
    }

    /// Implements the plan for `number` and reports the pull request, if any.
    ///
    /// The cached plan is reused; when there is none the planning stage runs
    /// first. The outcome is cached under [`ResultKind::Execution`].
    #[tracing::instrument(skip(self, repo), fields(repo = %repo.repository_id()))]
    pub async fn execute(
        &self,
        repo: &RepositoryUrl,
        number: IssueNumber,
    ) -> Result<ExecutionOutcome, AnalyzerError> {
        let issue = self.analyzer.fetcher().load_issue(repo, number).await?;

        let plan = match self.cached::<ActionPlan>(repo, ResultKind::Plan, number).await? {
            Some(plan) => {
                tracing::info!(steps = plan.steps.len(), "using cached plan");
                plan
            }
            None => {
                tracing::info!("no cached plan, planning first");
                let feasibility = self
                    .cached::<FeasibilityResult>(repo, ResultKind::Feasibility, number)
                    .await?;
                self.analyzer
                    .plan(repo, &issue, feasibility.as_ref())
                    .await?
            }
        };

        let details = self
            .analyzer
            .sessions()
            .run(
                Phase::Execution,
                prompts::execution(repo, &issue, &plan),
                Some(repo),
            )
            .await?;

        let report = match output::extract_json(
            self.analyzer.sessions().api(),
            &details,
            OutputName::Execution,
        )
        .await
        {
            Ok(value) if value.is_object() => Some(value),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "no execution report");
                None
            }
        };

        let outcome = outcome_from(number, &details, report.as_ref());
        match &outcome.pr_url {
            Some(url) => tracing::info!(pr_url = %url, "execution completed"),
            None => tracing::warn!(session_id = %details.id, "execution completed without a pull request"),
        }

        self.analyzer
            .store(
                &CacheKey::for_issue(repo, ResultKind::Execution, number),
                &outcome,
            )
            .await?;
        Ok(outcome)
    }

    /// Reads a cached result, treating an unreadable entry as absent.
    async fn cached<T: DeserializeOwned>(
        &self,
        repo: &RepositoryUrl,
        kind: ResultKind,
        number: IssueNumber,
    ) -> Result<Option<T>, AnalyzerError> {
        let key = CacheKey::for_issue(repo, kind, number);
        let Some(value) = self.analyzer.cache().load(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                tracing::warn!(%key, error = %e, "ignoring unreadable cache entry");
                Ok(None)
            }
        }
    }
}

/// `report` is the session's execution JSON, from structured output, the
/// `execution.json` attachment or a message.
fn outcome_from(
    number: IssueNumber,
    details: &SessionDetails,
    report: Option<&Value>,
) -> ExecutionOutcome {
    let field = |key: &str| report.and_then(|r| lenient::text(r.get(key)));

    ExecutionOutcome {
        issue_number: number,
        status: ExecutionStatus::Completed,
        pr_url: pull_request_url(details, report),
        branch: field("branch")
            .or_else(|| field("branch_name"))
            .and_then(BranchName::new),
        summary: field("summary"),
        session_id: details.id.clone(),
        completed_at: Timestamp::now(),
    }
}

/// Pull-request URL reported by a session, checked in order: the session's
/// own pull-request field, the report's `pr_url`, then the first link in the
/// agent's messages.
fn pull_request_url(details: &SessionDetails, report: Option<&Value>) -> Option<String> {
    details
        .pull_request_url
        .clone()
        .filter(|u| !u.is_empty())
        .or_else(|| report.and_then(|r| lenient::text(r.get("pr_url"))))
        .or_else(|| {
            details
                .messages
                .iter()
                .filter(|m| m.kind == pipeline::MessageKind::Agent)
                .find_map(|m| PULL_REQUEST_URL.find(&m.text))
                .map(|m| m.as_str().to_string())
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pipeline::PhaseTimeouts;
    use serde_json::json;

    use super::*;
    use crate::fetcher::IssueFetcher;
    use crate::session::SessionManager;
    use crate::testing::{issue, repo, FakeIssueSource, FakeSessionApi, MemoryCache, Script};

    const EXECUTE: &str = "Implement the approved plan";
    const PLAN: &str = "implementation plan";

    async fn executor(api: FakeSessionApi) -> (Arc<FakeSessionApi>, Arc<MemoryCache>, Executor) {
        let api = Arc::new(api);
        let cache = Arc::new(MemoryCache::default());
        let fetcher = IssueFetcher::new(
            Arc::new(FakeIssueSource::new(vec![issue(7, "Crash")])),
            cache.clone(),
        );
        fetcher.fetch(&repo(), false).await.unwrap();
        let analyzer = Analyzer::new(
            SessionManager::new(api.clone(), PhaseTimeouts::default()),
            fetcher,
            cache.clone(),
        );
        (api, cache, Executor::new(analyzer))
    }

    fn plan_output() -> Script {
        Script::output(json!({
            "summary": "Fix",
            "action_plan": [{"step": 1, "description": "Guard", "files": ["src/a.rs"]}]
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn plans_when_no_plan_is_cached_and_reports_pull_request() {
        let (api, cache, executor) = executor(
            FakeSessionApi::new().on(PLAN, plan_output()).on(
                EXECUTE,
                Script::message("Working on it")
                    .with_pull_request("https://github.com/octocat/hello/pull/12"),
            ),
        )
        .await;

        let outcome = executor.execute(&repo(), IssueNumber::new(7)).await.unwrap();

        assert_eq!(
            outcome.pr_url.as_deref(),
            Some("https://github.com/octocat/hello/pull/12")
        );
        assert_eq!(outcome.status, ExecutionStatus::Completed);
        assert_eq!(api.sessions_matching(PLAN), 1);
        let prompts = api.prompts();
        assert!(prompts[1].contains("\"description\": \"Guard\""));

        let key = CacheKey::for_issue(&repo(), ResultKind::Execution, IssueNumber::new(7));
        assert_eq!(
            cache.get(&key).unwrap()["pr_url"],
            json!("https://github.com/octocat/hello/pull/12")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cached_plan_is_reused_and_message_link_is_found() {
        let (api, _, executor) = executor(FakeSessionApi::new().on(
            EXECUTE,
            Script::message("PR is ready for review: https://github.com/octocat/hello/pull/3."),
        ))
        .await;
        executor
            .analyzer
            .store(
                &CacheKey::for_issue(&repo(), ResultKind::Plan, IssueNumber::new(7)),
                &json!({"issue_number": 7, "steps": [{"step": 1, "description": "cached step"}]}),
            )
            .await
            .unwrap();

        let outcome = executor.execute(&repo(), IssueNumber::new(7)).await.unwrap();

        assert_eq!(api.sessions_matching(PLAN), 0);
        assert!(api.prompts()[0].contains("cached step"));
        assert_eq!(
            outcome.pr_url.as_deref(),
            Some("https://github.com/octocat/hello/pull/3")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn completed_without_pull_request_omits_link() {
        let (_, _, executor) = executor(
            FakeSessionApi::new()
                .on(PLAN, plan_output())
                .on(EXECUTE, Script::output(json!({"branch": "fix/7", "summary": "done"}))),
        )
        .await;

        let outcome = executor.execute(&repo(), IssueNumber::new(7)).await.unwrap();

        assert_eq!(outcome.status, ExecutionStatus::Completed);
        assert_eq!(outcome.branch.as_ref().map(|b| b.as_str()), Some("fix/7"));
        let v = serde_json::to_value(&outcome).unwrap();
        assert_eq!(v["status"], "completed");
        assert!(v.get("pr_url").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn report_attachment_supplies_link_branch_and_summary() {
        let (_, cache, executor) = executor(
            FakeSessionApi::new()
                .on(PLAN, plan_output())
                .on(
                    EXECUTE,
                    Script::message("Done, see attachment.")
                        .with_attachment("u-9", "execution.json"),
                )
                .with_download(
                    "u-9",
                    r#"{"pr_url": "https://github.com/octocat/hello/pull/77", "branch": "fix/7", "summary": "did it"}"#,
                ),
        )
        .await;

        let outcome = executor.execute(&repo(), IssueNumber::new(7)).await.unwrap();

        assert_eq!(
            outcome.pr_url.as_deref(),
            Some("https://github.com/octocat/hello/pull/77")
        );
        assert_eq!(outcome.branch.as_ref().map(|b| b.as_str()), Some("fix/7"));
        assert_eq!(outcome.summary.as_deref(), Some("did it"));
        let key = CacheKey::for_issue(&repo(), ResultKind::Execution, IssueNumber::new(7));
        assert_eq!(cache.get(&key).unwrap()["branch"], "fix/7");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_execution_is_upstream_failure() {
        let (_, cache, executor) = executor(
            FakeSessionApi::new()
                .on(PLAN, plan_output())
                .on(EXECUTE, Script::failed()),
        )
        .await;

        let err = executor.execute(&repo(), IssueNumber::new(7)).await.unwrap_err();

        assert!(matches!(err, AnalyzerError::UpstreamFailure { .. }));
        let key = CacheKey::for_issue(&repo(), ResultKind::Execution, IssueNumber::new(7));
        assert!(cache.get(&key).is_none());
    }

    #[tokio::test]
    async fn unknown_issue_is_not_found() {
        let (_, _, executor) = executor(FakeSessionApi::new()).await;
        let err = executor.execute(&repo(), IssueNumber::new(99)).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::NotFound { .. }));
    }
}
