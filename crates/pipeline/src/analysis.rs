//! Issues and the results derived from them.
//!
//! These are the shapes persisted to the cache and returned to HTTP callers.
//! Remote payloads are interpreted loosely by the orchestration layer and then
//! normalised into these types; once constructed they always satisfy their
//! invariants (scores in range, plan steps ordered).

use serde::{Deserialize, Serialize};

use crate::{BranchName, IssueNumber, Score, SessionId, Timestamp};

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

/// A GitHub issue as fetched from the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: IssueNumber,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

fn default_state() -> String {
    "open".to_string()
}

// ---------------------------------------------------------------------------
// Feasibility
// ---------------------------------------------------------------------------

/// Size and reach of the change an issue requires.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeAssessment {
    /// `Small` / `Medium` / `Large` as reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// `Minimal` / `Module-wide` / `System-wide` as reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
}

/// Feasibility and complexity estimate for one issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityResult {
    pub issue_number: IssueNumber,
    #[serde(default)]
    pub issue_title: String,
    /// How implementable the issue is.
    pub feasibility_score: Score,
    /// How hard the implementation is likely to be.
    #[serde(default)]
    pub complexity_score: Score,
    /// How sure the service is of its own estimate.
    #[serde(default)]
    pub confidence: Score,
    #[serde(default)]
    pub scope: ScopeAssessment,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub estimated_files: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

// ---------------------------------------------------------------------------
// Action plan
// ---------------------------------------------------------------------------

/// One implementation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub step: u32,
    pub description: String,
    #[serde(default)]
    pub files: Vec<String>,
}

/// Ordered implementation plan for one issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub issue_number: IssueNumber,
    #[serde(default)]
    pub issue_title: String,
    #[serde(default)]
    pub summary: String,
    /// Steps sorted by [`PlanStep::step`].
    pub steps: Vec<PlanStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_effort: Option<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl ActionPlan {
    /// Every file mentioned by any step, first occurrence order, deduplicated.
    pub fn files(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.steps
            .iter()
            .flat_map(|s| s.files.iter())
            .map(String::as_str)
            .filter(|f| seen.insert(*f))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Analysis report
// ---------------------------------------------------------------------------

/// How the feasibility stage examined the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    /// Deep analysis restricted to the files returned by the scan.
    Targeted,
    /// The scan produced nothing usable; the whole repository was analysed.
    FullRepository,
}

/// Merged output of the analyzer pipeline for one issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub issue_number: IssueNumber,
    pub analysis_method: AnalysisMethod,
    /// Files the targeted analysis focused on; empty for full-repository analysis.
    pub files_analyzed: Vec<String>,
    pub feasibility: FeasibilityResult,
    pub plan: ActionPlan,
    pub analyzed_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Final status of an execution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
}

/// Result of asking the remote service to implement a plan.
///
/// `pr_url` is omitted from the serialised form when the service did not
/// report a pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub issue_number: IssueNumber,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub session_id: SessionId,
    pub completed_at: Timestamp,
}
