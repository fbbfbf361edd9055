//! Core domain for the issue analyzer.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, port trait and the cross-cutting error type. Infrastructure crates
//! implement the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`IssueNumber`, `SessionId`, `RepositoryUrl`, etc.) |
//! | [`types`] | Shared value types (`Score`, `PhaseTimeouts`, `CacheKey`, `Timestamp`) |
//! | [`analysis`] | Issues and derived results (`FeasibilityResult`, `ActionPlan`, ...) |
//! | [`session`] | Remote session model (`SessionStatus`, `SessionDetails`, ...) |
//! | [`ports`] | Traits implemented by infrastructure (`SessionApi`, `IssueSource`, `ResultCache`) |
//! | [`errors`] | [`AnalyzerError`] |

pub mod analysis;
pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod session;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use analysis::{
    ActionPlan, AnalysisMethod, AnalysisReport, ExecutionOutcome, ExecutionStatus,
    FeasibilityResult, Issue, PlanStep, ScopeAssessment,
};
pub use errors::AnalyzerError;
pub use identifiers::{BranchName, IssueNumber, RepositoryId, RepositoryUrl, SessionId};
pub use ports::{IssueSource, ResultCache, SessionApi};
pub use session::{
    Attachment, MessageKind, SessionDetails, SessionHandle, SessionMessage, SessionRequest,
    SessionStatus,
};
pub use types::{CacheKey, Phase, PhaseTimeouts, ResultKind, Score, Timestamp};
