//! Flat-file JSON result cache.
//!
//! Implements [`pipeline::ResultCache`] with one JSON file per cache key:
//!
//! ```text
//! <root>/<owner_repo>/issues.json
//! <root>/<owner_repo>/feasibility/<issue>.json
//! <root>/<owner_repo>/plan/<issue>.json
//! <root>/<owner_repo>/execution/<issue>.json
//! ```
//!
//! ## Consistency
//!
//! There is no locking. Each write goes to a uniquely named temporary file in
//! the target directory and is then renamed over the destination, so readers
//! see either the previous blob or the new one, never a partial write.
//! Concurrent writers to the same key race; the last rename wins.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use pipeline::{AnalyzerError, CacheKey, ResultCache, ResultKind};
use serde_json::Value;

/// [`ResultCache`] stored as JSON files under a root directory.
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    root: PathBuf,
}

impl JsonFileCache {
    /// Creates a cache rooted at `root`. Directories are created lazily on
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File that holds the entry for `key`.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        let repo_dir = self.root.join(sanitize(key.repository()));
        match (key.kind(), key.issue()) {
            (ResultKind::Issues, _) | (_, None) => {
                repo_dir.join(format!("{}.json", key.kind().as_str()))
            }
            (kind, Some(issue)) => repo_dir.join(kind.as_str()).join(format!("{issue}.json")),
        }
    }
}

#[async_trait]
impl ResultCache for JsonFileCache {
    async fn load(&self, key: &CacheKey) -> Result<Option<Value>, AnalyzerError> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(%key, "cache miss");
                return Ok(None);
            }
            Err(e) => {
                return Err(AnalyzerError::storage(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        let value = serde_json::from_slice(&bytes).map_err(|e| {
            AnalyzerError::storage(format!("corrupt cache entry {}: {e}", path.display()))
        })?;
        tracing::debug!(%key, "cache hit");
        Ok(Some(value))
    }

    async fn store(&self, key: &CacheKey, value: &Value) -> Result<(), AnalyzerError> {
        let path = self.path_for(key);
        let dir = path
            .parent()
            .ok_or_else(|| AnalyzerError::storage(format!("no parent for {}", path.display())))?;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AnalyzerError::storage(format!("failed to create {}: {e}", dir.display())))?;

        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| AnalyzerError::storage(format!("failed to serialise {key}: {e}")))?;

        let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| AnalyzerError::storage(format!("failed to write {}: {e}", tmp.display())))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AnalyzerError::storage(format!(
                "failed to replace {}: {e}",
                path.display()
            )));
        }

        tracing::debug!(%key, path = %path.display(), "cache entry written");
        Ok(())
    }
}

/// Keeps a repository key to a single safe path component.
fn sanitize(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
