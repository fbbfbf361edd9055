//! Issue analyzer orchestration.
//!
//! This crate sequences remote AI sessions into the fetch → analyse → execute
//! workflows: the Session Manager that polls a session to completion, output
//! extraction, the prompt templates, the Issue Fetcher, the Analyzer pipeline
//! (scan, feasibility, plan, multi-issue fan-out), and the Executor.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Modules here sequence calls between the domain
//! types in [`pipeline`] and the port traits it defines ([`pipeline::SessionApi`],
//! [`pipeline::IssueSource`], [`pipeline::ResultCache`]). Transport details
//! live in the infrastructure crates.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`session`] | `SessionManager`, `BackoffPolicy` |
//! | [`output`] | JSON result extraction from completed sessions |
//! | [`prompts`] | Prompt templates per phase |
//! | [`fetcher`] | `IssueFetcher`, `DevinIssueSource` |
//! | [`analyzer`] | `Analyzer`, `IssueAnalysisResult` |
//! | [`executor`] | `Executor` |
//! | [`workflow`] | `Workflows` facade, `IssueListing` |

pub mod analyzer;
pub mod executor;
pub mod fetcher;
mod lenient;
pub mod output;
pub mod prompts;
pub mod session;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use analyzer::{Analyzer, IssueAnalysisResult, MAX_SCANNED_FILES};
pub use executor::Executor;
pub use fetcher::{DevinIssueSource, IssueFetcher};
pub use output::OutputName;
pub use session::{BackoffPolicy, SessionManager};
pub use workflow::{IssueListing, Workflows};
