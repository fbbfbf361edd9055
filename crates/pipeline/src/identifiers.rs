//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! an [`IssueNumber`] with a step number even though both are integers under
//! the hood.

use serde::{Deserialize, Serialize};

use crate::AnalyzerError;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (GitHub-assigned integers).
// Generates: struct (Copy), new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: GitHub-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// Identifies a GitHub Issue within its repository.
    ///
    /// Wraps the issue number assigned by GitHub (positive integer).
    IssueNumber
}

impl std::str::FromStr for IssueNumber {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('#');
        trimmed
            .parse::<u64>()
            .map(Self)
            .map_err(|_| AnalyzerError::validation(format!("'{s}' is not a valid issue number")))
    }
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed (remote handles / Git names)
// ---------------------------------------------------------------------------

string_id! {
    /// Opaque identifier of a remote AI session (e.g. `"devin-3f2a..."`).
    SessionId
}

string_id! {
    /// A Git branch name created by the remote service during execution.
    BranchName
}

string_id! {
    /// Identifies a GitHub repository in `"owner/repo"` format.
    RepositoryId
}

// ---------------------------------------------------------------------------
// Repository URL
// ---------------------------------------------------------------------------

/// A parsed `https://github.com/<owner>/<repo>` reference.
///
/// Anything that does not contain `github.com/<owner>/<repo>` is rejected with
/// [`AnalyzerError::NotFound`]; an empty input is a validation failure instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryUrl {
    owner: String,
    name: String,
}

impl RepositoryUrl {
    /// Parses a GitHub repository URL.
    ///
    /// Accepts scheme-less URLs, trailing slashes, a `.git` suffix and deeper
    /// paths (`/issues/3`), which are ignored.
    pub fn parse(raw: &str) -> Result<Self, AnalyzerError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AnalyzerError::validation("repo_url is required"));
        }

        let Some(idx) = raw.find("github.com/") else {
            return Err(AnalyzerError::not_found(format!(
                "invalid GitHub repository URL: {raw}"
            )));
        };
        let mut segments = raw[idx + "github.com/".len()..]
            .split(['/', '?', '#'])
            .filter(|s| !s.is_empty());

        let owner = segments.next().unwrap_or_default();
        let name = segments
            .next()
            .map(|n| n.trim_end_matches(".git"))
            .unwrap_or_default();
        if owner.is_empty() || name.is_empty() {
            return Err(AnalyzerError::not_found(format!(
                "invalid GitHub repository URL: {raw}"
            )));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Repository owner (user or organisation).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `"owner/repo"` form.
    pub fn repository_id(&self) -> RepositoryId {
        RepositoryId(format!("{}/{}", self.owner, self.name))
    }

    /// Filesystem-safe key used to namespace cache entries (`"owner_repo"`).
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepositoryUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "https://github.com/{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_url() {
        let url = RepositoryUrl::parse("https://github.com/octocat/Hello-World").unwrap();
        assert_eq!(url.owner(), "octocat");
        assert_eq!(url.name(), "Hello-World");
        assert_eq!(url.cache_key(), "octocat_Hello-World");
        assert_eq!(url.repository_id().as_str(), "octocat/Hello-World");
        assert_eq!(url.to_string(), "https://github.com/octocat/Hello-World");
    }

    #[test]
    fn strips_git_suffix_and_extra_segments() {
        let url = RepositoryUrl::parse("github.com/rust-lang/rust.git/").unwrap();
        assert_eq!(url.name(), "rust");

        let url = RepositoryUrl::parse("https://github.com/tokio-rs/axum/issues/12").unwrap();
        assert_eq!(url.owner(), "tokio-rs");
        assert_eq!(url.name(), "axum");
    }

    #[test]
    fn rejects_non_github_url_as_not_found() {
        let err = RepositoryUrl::parse("https://gitlab.com/foo/bar").unwrap_err();
        assert!(matches!(err, AnalyzerError::NotFound { .. }));

        let err = RepositoryUrl::parse("https://github.com/only-owner").unwrap_err();
        assert!(matches!(err, AnalyzerError::NotFound { .. }));
    }

    #[test]
    fn empty_url_is_a_validation_error() {
        let err = RepositoryUrl::parse("   ").unwrap_err();
        assert!(matches!(err, AnalyzerError::Validation { .. }));
    }

    #[test]
    fn issue_number_parses_with_hash_prefix() {
        assert_eq!("#42".parse::<IssueNumber>().unwrap(), IssueNumber::new(42));
        assert_eq!(" 7 ".parse::<IssueNumber>().unwrap(), IssueNumber::new(7));
        assert!("seven".parse::<IssueNumber>().is_err());
    }
}
