//! Issue Fetcher: cache-first retrieval of a repository's open issues.

use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{
    AnalyzerError, CacheKey, Issue, IssueNumber, IssueSource, Phase, RepositoryUrl, ResultCache,
};
use serde_json::Value;

use crate::lenient;
use crate::output::{self, OutputName};
use crate::prompts;
use crate::session::SessionManager;

/// Retrieves issues through an [`IssueSource`] and keeps the list in the
/// [`ResultCache`], one entry per repository.
#[derive(Clone)]
pub struct IssueFetcher {
    source: Arc<dyn IssueSource>,
    cache: Arc<dyn ResultCache>,
}

impl IssueFetcher {
    pub fn new(source: Arc<dyn IssueSource>, cache: Arc<dyn ResultCache>) -> Self {
        Self { source, cache }
    }

    /// Returns the repository's issues sorted by number.
    ///
    /// The cached list is returned when present unless `refresh` is set; in
    /// that case (or on a miss) the source is called once and the cache entry
    /// is replaced.
    #[tracing::instrument(skip(self, repo), fields(repo = %repo.repository_id()))]
    pub async fn fetch(
        &self,
        repo: &RepositoryUrl,
        refresh: bool,
    ) -> Result<Vec<Issue>, AnalyzerError> {
        if !refresh {
            match self.cached(repo).await {
                Ok(Some(issues)) => {
                    tracing::info!(count = issues.len(), "using cached issues");
                    return Ok(issues);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "ignoring unreadable cached issue list"),
            }
        }

        let mut issues = self.source.list_issues(repo).await?;
        issues.sort_by_key(|i| i.number);
        issues.dedup_by_key(|i| i.number);

        let value = serde_json::to_value(&issues)
            .map_err(|e| AnalyzerError::storage(format!("failed to serialise issues: {e}")))?;
        self.cache.store(&CacheKey::issues(repo), &value).await?;
        tracing::info!(count = issues.len(), "cached issues");
        Ok(issues)
    }

    /// The cached issue list, or `None` if the repository was never fetched.
    pub async fn cached(&self, repo: &RepositoryUrl) -> Result<Option<Vec<Issue>>, AnalyzerError> {
        let Some(value) = self.cache.load(&CacheKey::issues(repo)).await? else {
            return Ok(None);
        };
        let mut issues: Vec<Issue> = serde_json::from_value(value).map_err(|e| {
            AnalyzerError::storage(format!(
                "cached issues for {} are unreadable: {e}",
                repo.repository_id()
            ))
        })?;
        issues.sort_by_key(|i| i.number);
        Ok(Some(issues))
    }

    /// Looks up one issue in the cached list.
    ///
    /// Returns [`AnalyzerError::NotFound`] if the repository's issues have not
    /// been fetched or the issue is not among them.
    pub async fn load_issue(
        &self,
        repo: &RepositoryUrl,
        number: IssueNumber,
    ) -> Result<Issue, AnalyzerError> {
        let issues = self.cached(repo).await?.ok_or_else(|| {
            AnalyzerError::not_found(format!(
                "issues for {} (fetch them first)",
                repo.repository_id()
            ))
        })?;
        issues
            .into_iter()
            .find(|i| i.number == number)
            .ok_or_else(|| {
                AnalyzerError::not_found(format!("issue #{number} in {}", repo.repository_id()))
            })
    }
}

impl std::fmt::Debug for IssueFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueFetcher").finish_non_exhaustive()
    }
}

/// [`IssueSource`] that asks the AI service to list the issues.
#[derive(Debug, Clone)]
pub struct DevinIssueSource {
    sessions: SessionManager,
}

impl DevinIssueSource {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl IssueSource for DevinIssueSource {
    async fn list_issues(&self, repo: &RepositoryUrl) -> Result<Vec<Issue>, AnalyzerError> {
        let details = self
            .sessions
            .run(Phase::IssueFetch, prompts::list_issues(repo), Some(repo))
            .await?;
        let value = output::extract_json(self.sessions.api(), &details, OutputName::Issues).await?;
        parse_issue_list(&value)
    }
}

/// Normalises an agent-produced issue list.
///
/// Accepts a bare array or `{"issues": [...]}`. Entries without a usable
/// number are dropped.
fn parse_issue_list(value: &Value) -> Result<Vec<Issue>, AnalyzerError> {
    let items = value
        .as_array()
        .or_else(|| value.get("issues").and_then(Value::as_array))
        .ok_or_else(|| AnalyzerError::upstream("issue list is not a JSON array"))?;

    Ok(items.iter().filter_map(parse_issue).collect())
}

fn parse_issue(item: &Value) -> Option<Issue> {
    let number = item
        .get("number")
        .and_then(lenient::number)
        .filter(|n| *n >= 1.0 && n.fract() == 0.0)?;

    Some(Issue {
        number: IssueNumber::new(number as u64),
        title: lenient::text(item.get("title")).unwrap_or_default(),
        body: lenient::text(item.get("body")).unwrap_or_default(),
        state: lenient::text(item.get("state")).unwrap_or_else(|| "open".to_string()),
        created_at: lenient::text(item.get("created_at")),
        updated_at: lenient::text(item.get("updated_at")),
        labels: lenient::text_list(item.get("labels")),
    })
}

#[cfg(test)]
mod tests {
    use pipeline::PhaseTimeouts;
    use serde_json::json;

    use super::*;
    use crate::testing::{issue, repo, FakeIssueSource, FakeSessionApi, MemoryCache, Script};

    fn fetcher(issues: Vec<Issue>) -> (Arc<FakeIssueSource>, Arc<MemoryCache>, IssueFetcher) {
        let source = Arc::new(FakeIssueSource::new(issues));
        let cache = Arc::new(MemoryCache::default());
        let fetcher = IssueFetcher::new(source.clone(), cache.clone());
        (source, cache, fetcher)
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let (source, _, fetcher) = fetcher(vec![issue(2, "b"), issue(1, "a")]);

        let first = fetcher.fetch(&repo(), false).await.unwrap();
        let second = fetcher.fetch(&repo(), false).await.unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(first, second);
        assert_eq!(
            first.iter().map(|i| i.number.as_u64()).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[tokio::test]
    async fn refresh_bypasses_cache() {
        let (source, _, fetcher) = fetcher(vec![issue(1, "a")]);

        fetcher.fetch(&repo(), false).await.unwrap();
        fetcher.fetch(&repo(), true).await.unwrap();

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn load_issue_requires_a_prior_fetch() {
        let (_, _, fetcher) = fetcher(vec![issue(1, "a")]);

        let err = fetcher
            .load_issue(&repo(), IssueNumber::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::NotFound { .. }));

        fetcher.fetch(&repo(), false).await.unwrap();
        assert_eq!(
            fetcher
                .load_issue(&repo(), IssueNumber::new(1))
                .await
                .unwrap()
                .title,
            "a"
        );
        let err = fetcher
            .load_issue(&repo(), IssueNumber::new(9))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("#9"));
    }

    #[test]
    fn agent_issue_lists_are_normalised() {
        let issues = parse_issue_list(&json!({"issues": [
            {"number": "3", "title": "Three", "labels": [{"name": "bug"}, "ui"]},
            {"title": "no number"},
            {"number": 1, "title": "One", "body": null}
        ]}))
        .unwrap();

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].number, IssueNumber::new(3));
        assert_eq!(issues[0].labels, vec!["bug", "ui"]);
        assert_eq!(issues[1].state, "open");
        assert!(issues[1].body.is_empty());

        assert!(parse_issue_list(&json!({"count": 0})).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn devin_source_reads_issue_attachment() {
        let api = Arc::new(
            FakeSessionApi::new()
                .on(
                    "List every open issue",
                    Script::message("Saved.").with_attachment("u-1", "issues.json"),
                )
                .with_download("u-1", r#"[{"number": 4, "title": "Four"}]"#),
        );
        let source = DevinIssueSource::new(SessionManager::new(api, PhaseTimeouts::default()));

        let issues = source.list_issues(&repo()).await.unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].title, "Four");
    }

    #[tokio::test(start_paused = true)]
    async fn devin_source_reads_list_written_in_a_message() {
        let api = Arc::new(FakeSessionApi::new().on(
            "List every open issue",
            Script::message(
                r#"Here are the issues: [{"number": 5, "title": "Five"}, {"number": 4, "title": "Four"}]"#,
            ),
        ));
        let source = DevinIssueSource::new(SessionManager::new(api, PhaseTimeouts::default()));

        let issues = source.list_issues(&repo()).await.unwrap();

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].number.as_u64(), 5);
        assert_eq!(issues[1].title, "Four");
    }
}
