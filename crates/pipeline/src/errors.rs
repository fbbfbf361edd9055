//! Top-level error type for the issue analyzer domain.
//!
//! [`AnalyzerError`] is shared by every crate in the workspace: infrastructure
//! adapters translate their transport failures into it, the orchestration layer
//! propagates it, and the web layer maps each variant onto an HTTP status.
//!
//! Nothing is retried automatically. The only loop in the system is the session
//! poll; once it gives up (or the remote side reports failure) the error
//! surfaces to the caller verbatim.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SessionId;

/// Errors produced while fetching, analysing, or executing issues.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum AnalyzerError {
    /// A repository, issue, or cached artefact does not exist.
    ///
    /// Produced by: repository URL parsing, the GitHub issues endpoint
    /// returning 404, and issue lookups against a repository that was never
    /// fetched.
    #[error("Not found: {what}")]
    NotFound {
        /// Description of the missing thing.
        what: String,
    },

    /// A remote session did not reach a terminal state within its phase budget.
    #[error("Session {session_id} timed out after {}s", budget.as_secs())]
    Timeout {
        /// Session that was being polled.
        session_id: SessionId,
        /// Budget that was exceeded.
        budget: Duration,
    },

    /// A remote API returned an error, failed at the transport level, or
    /// produced a response that could not be interpreted.
    #[error("Upstream failure: {message}")]
    UpstreamFailure {
        /// Remote error body or a description of the malformed response.
        message: String,
    },

    /// A request is missing a required field or carries an invalid value.
    #[error("Validation error: {message}")]
    Validation {
        /// Description of the offending field.
        message: String,
    },

    /// The local result cache could not be read or written.
    #[error("Storage error: {message}")]
    Storage {
        /// Underlying I/O or serialisation failure.
        message: String,
    },

    /// The runtime configuration is invalid.
    ///
    /// Produced at load time; the service never starts with an invalid config.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl AnalyzerError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamFailure {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Short machine-readable tag for the variant (`"not_found"`, `"timeout"`, ...).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Timeout { .. } => "timeout",
            Self::UpstreamFailure { .. } => "upstream_failure",
            Self::Validation { .. } => "validation_error",
            Self::Storage { .. } => "storage_error",
            Self::Configuration { .. } => "configuration_error",
        }
    }
}
