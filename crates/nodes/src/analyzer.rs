//! Analyzer pipeline: scan → feasibility → plan.
//!
//! Every stage is a separate remote session with its own prompt and phase
//! budget. The scan is best-effort: if it fails, times out, or returns nothing
//! usable, feasibility falls back to a full-repository analysis. Feasibility
//! and planning failures are not recovered.

use std::sync::Arc;

use futures::future::join_all;
use pipeline::{
    ActionPlan, AnalysisMethod, AnalysisReport, AnalyzerError, CacheKey, FeasibilityResult,
    Issue, IssueNumber, Phase, PlanStep, RepositoryUrl, ResultCache, ResultKind, Score,
    ScopeAssessment, Timestamp,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fetcher::IssueFetcher;
use crate::lenient;
use crate::output::{self, OutputName};
use crate::prompts;
use crate::session::SessionManager;

/// Most files carried from the scan into targeted analysis.
pub const MAX_SCANNED_FILES: usize = 10;

const TECHNICAL_SECTIONS: &[&str] = &["technical_analysis"];

/// Runs the analysis stages for one issue at a time.
#[derive(Clone)]
pub struct Analyzer {
    sessions: SessionManager,
    fetcher: IssueFetcher,
    cache: Arc<dyn ResultCache>,
}

/// Per-issue entry of a multi-issue analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IssueAnalysisResult {
    Completed {
        issue_id: IssueNumber,
        #[serde(flatten)]
        report: Box<AnalysisReport>,
    },
    Error {
        issue_id: IssueNumber,
        error: String,
        kind: String,
    },
}

impl IssueAnalysisResult {
    pub fn issue_id(&self) -> IssueNumber {
        match self {
            Self::Completed { issue_id, .. } | Self::Error { issue_id, .. } => *issue_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

impl Analyzer {
    pub fn new(
        sessions: SessionManager,
        fetcher: IssueFetcher,
        cache: Arc<dyn ResultCache>,
    ) -> Self {
        Self {
            sessions,
            fetcher,
            cache,
        }
    }

    pub fn fetcher(&self) -> &IssueFetcher {
        &self.fetcher
    }

    pub(crate) fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub(crate) fn cache(&self) -> &dyn ResultCache {
        self.cache.as_ref()
    }

    /// Loads `number` from the cached issue list and runs the full pipeline.
    #[tracing::instrument(skip(self, repo), fields(repo = %repo.repository_id()))]
    pub async fn analyze_issue(
        &self,
        repo: &RepositoryUrl,
        number: IssueNumber,
    ) -> Result<AnalysisReport, AnalyzerError> {
        let issue = self.fetcher.load_issue(repo, number).await?;
        self.analyze(repo, &issue).await
    }

    /// Runs [`analyze_issue`](Self::analyze_issue) concurrently for every id.
    ///
    /// Returns one entry per id, in input order; a failure for one issue is
    /// reported in its entry and does not affect the others.
    #[tracing::instrument(skip(self, repo, ids), fields(repo = %repo.repository_id(), count = ids.len()))]
    pub async fn analyze_many(
        &self,
        repo: &RepositoryUrl,
        ids: &[IssueNumber],
    ) -> Result<Vec<IssueAnalysisResult>, AnalyzerError> {
        if ids.is_empty() {
            return Err(AnalyzerError::validation("issue_ids must not be empty"));
        }

        let runs = ids.iter().map(|&id| async move {
            match self.analyze_issue(repo, id).await {
                Ok(report) => IssueAnalysisResult::Completed {
                    issue_id: id,
                    report: Box::new(report),
                },
                Err(e) => {
                    tracing::warn!(issue_number = %id, error = %e, "issue analysis failed");
                    IssueAnalysisResult::Error {
                        issue_id: id,
                        error: e.to_string(),
                        kind: e.kind().to_string(),
                    }
                }
            }
        });
        let results = join_all(runs).await;

        let completed = results.iter().filter(|r| r.is_completed()).count();
        tracing::info!(completed, failed = results.len() - completed, "batch analysis finished");
        Ok(results)
    }

    /// Scan, feasibility and planning for an already-loaded issue.
    ///
    /// Feasibility and plan are written to the cache, replacing earlier
    /// results, only once both stages have succeeded.
    #[tracing::instrument(skip(self, repo, issue), fields(issue_number = %issue.number))]
    pub async fn analyze(
        &self,
        repo: &RepositoryUrl,
        issue: &Issue,
    ) -> Result<AnalysisReport, AnalyzerError> {
        let (method, files, feasibility) = self.assess_feasibility(repo, issue).await?;
        let plan = self.draft_plan(repo, issue, Some(&feasibility)).await?;

        self.store(
            &CacheKey::for_issue(repo, ResultKind::Feasibility, issue.number),
            &feasibility,
        )
        .await?;
        self.store(
            &CacheKey::for_issue(repo, ResultKind::Plan, issue.number),
            &plan,
        )
        .await?;

        Ok(AnalysisReport {
            issue_number: issue.number,
            analysis_method: method,
            files_analyzed: files,
            feasibility,
            plan,
            analyzed_at: Timestamp::now(),
        })
    }

    /// Quick scan for the files most relevant to `issue`.
    pub async fn scan(
        &self,
        repo: &RepositoryUrl,
        issue: &Issue,
    ) -> Result<Vec<String>, AnalyzerError> {
        let details = self
            .sessions
            .run(Phase::Scan, prompts::scan(repo, issue), Some(repo))
            .await?;
        let value = output::extract_json(self.sessions.api(), &details, OutputName::Scan).await?;
        let files = parse_scan(&value)?;
        tracing::info!(files = files.len(), "scan complete");
        Ok(files)
    }

    async fn assess_feasibility(
        &self,
        repo: &RepositoryUrl,
        issue: &Issue,
    ) -> Result<(AnalysisMethod, Vec<String>, FeasibilityResult), AnalyzerError> {
        let files = match self.scan(repo, issue).await {
            Ok(files) if !files.is_empty() => files,
            Ok(_) => {
                tracing::warn!("scan found no relevant files, falling back to full analysis");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "scan failed, falling back to full analysis");
                Vec::new()
            }
        };

        let (method, phase, prompt) = if files.is_empty() {
            (
                AnalysisMethod::FullRepository,
                Phase::FullAnalysis,
                prompts::full_analysis(repo, issue),
            )
        } else {
            (
                AnalysisMethod::Targeted,
                Phase::TargetedAnalysis,
                prompts::targeted_analysis(repo, issue, &files),
            )
        };

        let details = self.sessions.run(phase, prompt, Some(repo)).await?;
        let value =
            output::extract_json(self.sessions.api(), &details, OutputName::Analysis).await?;
        let feasibility = parse_feasibility(issue, &value)?;
        tracing::info!(
            method = ?method,
            feasibility = feasibility.feasibility_score.value(),
            complexity = feasibility.complexity_score.value(),
            "feasibility assessed"
        );
        Ok((method, files, feasibility))
    }

    /// Produces and caches an implementation plan for `issue`.
    pub async fn plan(
        &self,
        repo: &RepositoryUrl,
        issue: &Issue,
        feasibility: Option<&FeasibilityResult>,
    ) -> Result<ActionPlan, AnalyzerError> {
        let plan = self.draft_plan(repo, issue, feasibility).await?;
        self.store(
            &CacheKey::for_issue(repo, ResultKind::Plan, issue.number),
            &plan,
        )
        .await?;
        Ok(plan)
    }

    async fn draft_plan(
        &self,
        repo: &RepositoryUrl,
        issue: &Issue,
        feasibility: Option<&FeasibilityResult>,
    ) -> Result<ActionPlan, AnalyzerError> {
        let details = self
            .sessions
            .run(
                Phase::Planning,
                prompts::planning(repo, issue, feasibility),
                Some(repo),
            )
            .await?;
        let value = output::extract_json(self.sessions.api(), &details, OutputName::Plan).await?;
        let plan = parse_plan(issue, &value)?;
        tracing::info!(steps = plan.steps.len(), "plan created");
        Ok(plan)
    }

    pub(crate) async fn store<T: Serialize>(
        &self,
        key: &CacheKey,
        value: &T,
    ) -> Result<(), AnalyzerError> {
        let value = serde_json::to_value(value)
            .map_err(|e| AnalyzerError::storage(format!("failed to serialise {key}: {e}")))?;
        self.cache.store(key, &value).await
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Paths from `relevant_files`, most relevant first, at most
/// [`MAX_SCANNED_FILES`].
fn parse_scan(value: &Value) -> Result<Vec<String>, AnalyzerError> {
    let entries = value
        .get("relevant_files")
        .and_then(Value::as_array)
        .ok_or_else(|| AnalyzerError::upstream("scan result has no relevant_files array"))?;

    let mut scored: Vec<(f64, String)> = entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(path) => Some((0.0, path.trim().to_string())),
            Value::Object(_) => {
                let path = lenient::text(entry.get("path").or_else(|| entry.get("file")))?;
                let score = entry
                    .get("relevance_score")
                    .and_then(lenient::number)
                    .unwrap_or(0.0);
                Some((score, path))
            }
            _ => None,
        })
        .filter(|(_, path)| !path.is_empty())
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    Ok(scored
        .into_iter()
        .map(|(_, path)| path)
        .take(MAX_SCANNED_FILES)
        .collect())
}

fn parse_feasibility(issue: &Issue, value: &Value) -> Result<FeasibilityResult, AnalyzerError> {
    if !value.is_object() {
        return Err(AnalyzerError::upstream("feasibility result is not a JSON object"));
    }
    let score = |keys: &[&str]| {
        keys.iter()
            .filter_map(|k| value.get(*k))
            .find_map(Score::from_json)
    };

    let feasibility_score = score(&["feasibility_score", "confidence_score"])
        .ok_or_else(|| AnalyzerError::upstream("feasibility result has no feasibility_score"))?;

    let scope = value
        .get("scope_assessment")
        .or_else(|| value.get("scope"))
        .map(|s| ScopeAssessment {
            size: lenient::text(s.get("size")),
            impact: lenient::text(s.get("impact")),
        })
        .unwrap_or_default();

    let mut estimated_files =
        lenient::text_list(lenient::find(value, TECHNICAL_SECTIONS, "estimated_files"));
    if estimated_files.is_empty() {
        estimated_files = lenient::text_list(
            lenient::find(value, TECHNICAL_SECTIONS, "files_to_modify")
                .or_else(|| lenient::find(value, TECHNICAL_SECTIONS, "files")),
        );
    }

    Ok(FeasibilityResult {
        issue_number: issue.number,
        issue_title: issue.title.clone(),
        feasibility_score,
        complexity_score: score(&["complexity_score"]).unwrap_or_default(),
        confidence: score(&["confidence", "confidence_score"]).unwrap_or_default(),
        scope,
        risks: lenient::text_list(lenient::find(value, TECHNICAL_SECTIONS, "risks")),
        estimated_files,
        dependencies: lenient::text_list(lenient::find(value, TECHNICAL_SECTIONS, "dependencies")),
    })
}

fn parse_plan(issue: &Issue, value: &Value) -> Result<ActionPlan, AnalyzerError> {
    let mut steps = match value.get("action_plan") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| parse_step(i, item))
            .collect::<Vec<_>>(),
        Some(Value::String(text)) => text
            .lines()
            .map(strip_list_marker)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| PlanStep {
                step: i as u32 + 1,
                description: line.to_string(),
                files: Vec::new(),
            })
            .collect(),
        _ => {
            return Err(AnalyzerError::upstream(
                "plan result has no action_plan list",
            ))
        }
    };
    steps.sort_by_key(|s| s.step);

    Ok(ActionPlan {
        issue_number: issue.number,
        issue_title: issue.title.clone(),
        summary: lenient::text(value.get("summary")).unwrap_or_default(),
        steps,
        estimated_effort: lenient::text(value.get("estimated_effort")),
        risks: lenient::text_list(value.get("risks")),
        dependencies: lenient::text_list(value.get("dependencies")),
    })
}

fn parse_step(index: usize, item: &Value) -> Option<PlanStep> {
    let position = index as u32 + 1;
    match item {
        Value::Object(_) => {
            let description = ["description", "action", "title"]
                .iter()
                .find_map(|k| lenient::text(item.get(*k)))?;
            let step = item
                .get("step")
                .and_then(lenient::number)
                .filter(|n| *n >= 0.0)
                .map(|n| n as u32)
                .unwrap_or(position);
            Some(PlanStep {
                step,
                description,
                files: lenient::text_list(item.get("files")),
            })
        }
        other => lenient::text(Some(other)).map(|description| PlanStep {
            step: position,
            description,
            files: Vec::new(),
        }),
    }
}

/// Trims `1.`, `2)`, `-` and `*` prefixes off a plan line.
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let rest = &line[digits..];
    let rest = if digits > 0 {
        rest.strip_prefix('.')
            .or_else(|| rest.strip_prefix(')'))
            .unwrap_or(rest)
    } else {
        rest.strip_prefix('-')
            .or_else(|| rest.strip_prefix('*'))
            .unwrap_or(rest)
    };
    rest.trim()
}
