//! Shared value types for the issue analyzer domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (scores are in `[0, 100]`, phase budgets
//! are strictly positive) and participate in domain computations.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AnalyzerError, IssueNumber, RepositoryUrl};

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

/// An integer score in the range `[0, 100]`.
///
/// Used for feasibility, complexity and confidence. Construction never fails:
/// out-of-range values are clamped, and non-finite values collapse to zero, so
/// a [`Score`] read back from any remote payload is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "f64")]
pub struct Score(u8);

impl Score {
    /// Upper bound of the scale.
    pub const MAX: Score = Score(100);

    /// Clamps `value` into `[0, 100]` (rounding to the nearest integer).
    pub fn clamped(value: f64) -> Self {
        if !value.is_finite() {
            return Self(0);
        }
        Self(value.round().clamp(0.0, 100.0) as u8)
    }

    /// Interprets a loosely-typed JSON value: numbers and numeric strings are
    /// accepted, anything else yields `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map(Self::clamped),
            serde_json::Value::String(s) => s
                .trim()
                .trim_end_matches('%')
                .parse::<f64>()
                .ok()
                .map(Self::clamped),
            _ => None,
        }
    }

    /// Returns the score as an integer in `[0, 100]`.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl From<f64> for Score {
    fn from(value: f64) -> Self {
        Self::clamped(value)
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/100", self.0)
    }
}

// ---------------------------------------------------------------------------
// Phase budgets
// ---------------------------------------------------------------------------

/// A stage of the orchestration that drives a remote session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Listing repository issues through the AI service.
    IssueFetch,
    /// Quick scan for files relevant to an issue.
    Scan,
    /// Deep analysis restricted to the scanned files.
    TargetedAnalysis,
    /// Deep analysis of the whole repository (scan fallback).
    FullAnalysis,
    /// Implementation planning.
    Planning,
    /// Applying changes and opening a pull request.
    Execution,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::IssueFetch => "issue_fetch",
            Self::Scan => "scan",
            Self::TargetedAnalysis => "targeted_analysis",
            Self::FullAnalysis => "full_analysis",
            Self::Planning => "planning",
            Self::Execution => "execution",
        };
        f.write_str(s)
    }
}

/// Per-phase polling budgets.
///
/// Budgets run to minutes because remote sessions clone and inspect whole
/// repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTimeouts {
    pub issue_fetch: Duration,
    pub scan: Duration,
    pub targeted_analysis: Duration,
    pub full_analysis: Duration,
    pub planning: Duration,
    pub execution: Duration,
}

impl PhaseTimeouts {
    /// Budget for `phase`.
    pub fn for_phase(&self, phase: Phase) -> Duration {
        match phase {
            Phase::IssueFetch => self.issue_fetch,
            Phase::Scan => self.scan,
            Phase::TargetedAnalysis => self.targeted_analysis,
            Phase::FullAnalysis => self.full_analysis,
            Phase::Planning => self.planning,
            Phase::Execution => self.execution,
        }
    }

    /// Returns a [`AnalyzerError::Configuration`] if any budget is zero.
    pub fn validate(&self) -> Result<(), AnalyzerError> {
        let phases = [
            Phase::IssueFetch,
            Phase::Scan,
            Phase::TargetedAnalysis,
            Phase::FullAnalysis,
            Phase::Planning,
            Phase::Execution,
        ];
        for phase in phases {
            if self.for_phase(phase).is_zero() {
                return Err(AnalyzerError::configuration(format!(
                    "timeout for phase '{phase}' must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}

impl Default for PhaseTimeouts {
    fn default() -> Self {
        Self {
            issue_fetch: Duration::from_secs(120),
            scan: Duration::from_secs(180),
            targeted_analysis: Duration::from_secs(300),
            full_analysis: Duration::from_secs(600),
            planning: Duration::from_secs(600),
            execution: Duration::from_secs(1800),
        }
    }
}

// ---------------------------------------------------------------------------
// Cache keys
// ---------------------------------------------------------------------------

/// Kind of result stored in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// The repository's issue list (one entry per repository).
    Issues,
    /// A [`crate::FeasibilityResult`].
    Feasibility,
    /// A [`crate::ActionPlan`].
    Plan,
    /// A [`crate::ExecutionOutcome`].
    Execution,
}

impl ResultKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issues => "issues",
            Self::Feasibility => "feasibility",
            Self::Plan => "plan",
            Self::Execution => "execution",
        }
    }
}

/// Address of one cache entry: `(repository, kind, issue)`.
///
/// The issue list is stored per repository and has no issue component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    repository: String,
    kind: ResultKind,
    issue: Option<IssueNumber>,
}

impl CacheKey {
    /// Key of the cached issue list for `repo`.
    pub fn issues(repo: &RepositoryUrl) -> Self {
        Self {
            repository: repo.cache_key(),
            kind: ResultKind::Issues,
            issue: None,
        }
    }

    /// Key of a per-issue result.
    pub fn for_issue(repo: &RepositoryUrl, kind: ResultKind, issue: IssueNumber) -> Self {
        Self {
            repository: repo.cache_key(),
            kind,
            issue: Some(issue),
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    pub fn issue(&self) -> Option<IssueNumber> {
        self.issue
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.issue {
            Some(issue) => write!(f, "{}/{}/{}", self.repository, self.kind.as_str(), issue),
            None => write!(f, "{}/{}", self.repository, self.kind.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn score_clamps_into_range() {
        assert_eq!(Score::clamped(150.0).value(), 100);
        assert_eq!(Score::clamped(-3.0).value(), 0);
        assert_eq!(Score::clamped(72.4).value(), 72);
        assert_eq!(Score::clamped(f64::NAN).value(), 0);
    }

    #[test]
    fn score_reads_loose_json() {
        assert_eq!(Score::from_json(&json!(85)).unwrap().value(), 85);
        assert_eq!(Score::from_json(&json!("60%")).unwrap().value(), 60);
        assert_eq!(Score::from_json(&json!(1e9)).unwrap().value(), 100);
        assert!(Score::from_json(&json!("high")).is_none());
        assert!(Score::from_json(&json!(null)).is_none());
    }

    #[test]
    fn score_deserialisation_clamps() {
        let score: Score = serde_json::from_value(json!(250)).unwrap();
        assert_eq!(score, Score::MAX);
        assert_eq!(serde_json::to_value(score).unwrap(), json!(100));
    }

    #[test]
    fn default_timeouts_are_valid_and_ordered() {
        let t = PhaseTimeouts::default();
        t.validate().unwrap();
        assert!(t.scan < t.targeted_analysis);
        assert!(t.targeted_analysis < t.full_analysis);
        assert_eq!(t.for_phase(Phase::Execution), Duration::from_secs(1800));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let t = PhaseTimeouts {
            scan: Duration::ZERO,
            ..PhaseTimeouts::default()
        };
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("scan"));
    }

    #[test]
    fn cache_key_display() {
        let repo = RepositoryUrl::parse("https://github.com/octocat/hello").unwrap();
        assert_eq!(CacheKey::issues(&repo).to_string(), "octocat_hello/issues");
        assert_eq!(
            CacheKey::for_issue(&repo, ResultKind::Plan, IssueNumber::new(3)).to_string(),
            "octocat_hello/plan/3"
        );
    }
}
