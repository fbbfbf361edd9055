//! Port traits implemented by infrastructure crates.
//!
//! The orchestration layer depends only on these traits; concrete adapters
//! (`devin`, `github`, `cache`) are injected by the binary's composition root.
//! All traits are object-safe so they can be held as `Arc<dyn ...>`.

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    AnalyzerError, Attachment, CacheKey, Issue, RepositoryUrl, SessionDetails, SessionHandle,
    SessionId, SessionRequest,
};

/// Remote AI session API.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Opens a new session.
    async fn create_session(&self, request: &SessionRequest)
        -> Result<SessionHandle, AnalyzerError>;

    /// Fetches the current state of a session.
    async fn get_session(&self, id: &SessionId) -> Result<SessionDetails, AnalyzerError>;

    /// Downloads the text content of an attachment.
    async fn download_attachment(&self, attachment: &Attachment) -> Result<String, AnalyzerError>;
}

/// Source of repository issues.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Lists the repository's open issues in a single pass.
    ///
    /// Returns [`AnalyzerError::NotFound`] if the repository does not exist.
    async fn list_issues(&self, repo: &RepositoryUrl) -> Result<Vec<Issue>, AnalyzerError>;
}

/// Persistent store of the most recent JSON blob per [`CacheKey`].
///
/// Writes overwrite; there is no versioning and no expiry.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Returns the stored value, or `None` on a miss.
    async fn load(&self, key: &CacheKey) -> Result<Option<Value>, AnalyzerError>;

    /// Stores `value`, replacing any previous entry.
    async fn store(&self, key: &CacheKey, value: &Value) -> Result<(), AnalyzerError>;
}
