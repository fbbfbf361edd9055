//! Request-level entry points.
//!
//! [`Workflows`] is what the web layer and the CLI talk to. It accepts raw
//! repository URLs, validates them, and delegates to the fetcher, analyzer
//! and executor.

use std::sync::Arc;

use pipeline::{
    AnalysisReport, AnalyzerError, ExecutionOutcome, Issue, IssueNumber, IssueSource,
    RepositoryUrl, ResultCache,
};
use serde::{Deserialize, Serialize};

use crate::analyzer::{Analyzer, IssueAnalysisResult};
use crate::executor::Executor;
use crate::fetcher::IssueFetcher;
use crate::session::SessionManager;

/// Issues of one repository, as returned by [`Workflows::fetch_issues`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueListing {
    pub repo_url: String,
    pub owner: String,
    pub repo: String,
    pub issues: Vec<Issue>,
}

/// Facade over the orchestration components.
#[derive(Debug, Clone)]
pub struct Workflows {
    analyzer: Analyzer,
    executor: Executor,
}

impl Workflows {
    pub fn new(
        sessions: SessionManager,
        source: Arc<dyn IssueSource>,
        cache: Arc<dyn ResultCache>,
    ) -> Self {
        let fetcher = IssueFetcher::new(source, cache.clone());
        let analyzer = Analyzer::new(sessions, fetcher, cache);
        let executor = Executor::new(analyzer.clone());
        Self { analyzer, executor }
    }

    pub async fn fetch_issues(
        &self,
        repo_url: &str,
        refresh: bool,
    ) -> Result<IssueListing, AnalyzerError> {
        let repo = RepositoryUrl::parse(repo_url)?;
        let issues = self.analyzer.fetcher().fetch(&repo, refresh).await?;
        Ok(IssueListing {
            repo_url: repo.to_string(),
            owner: repo.owner().to_string(),
            repo: repo.name().to_string(),
            issues,
        })
    }

    pub async fn analyze_issue(
        &self,
        repo_url: &str,
        issue: IssueNumber,
    ) -> Result<AnalysisReport, AnalyzerError> {
        let repo = RepositoryUrl::parse(repo_url)?;
        self.analyzer.analyze_issue(&repo, issue).await
    }

    pub async fn analyze_many(
        &self,
        repo_url: &str,
        issues: &[IssueNumber],
    ) -> Result<Vec<IssueAnalysisResult>, AnalyzerError> {
        let repo = RepositoryUrl::parse(repo_url)?;
        self.analyzer.analyze_many(&repo, issues).await
    }

    pub async fn execute(
        &self,
        repo_url: &str,
        issue: IssueNumber,
    ) -> Result<ExecutionOutcome, AnalyzerError> {
        let repo = RepositoryUrl::parse(repo_url)?;
        self.executor.execute(&repo, issue).await
    }
}
