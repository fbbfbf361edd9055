//! Command-line and environment configuration.
//!
//! Every flag has an environment fallback so the binary can be configured
//! from a `.env` file alone.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use devin::DevinConfig;
use github::GithubConfig;
use pipeline::{AnalyzerError, PhaseTimeouts};

#[derive(Debug, Parser)]
#[command(
    name = "issue-analyzer",
    version,
    about = "Analyze GitHub issues and implement them with remote AI sessions"
)]
pub struct Cli {
    /// API key for the remote session service
    #[arg(long, env = "DEVIN_API_KEY", hide_env_values = true)]
    pub devin_api_key: String,

    /// Base URL of the remote session service
    #[arg(long, env = "DEVIN_API_BASE", default_value = devin::DEFAULT_API_BASE)]
    pub devin_api_base: String,

    /// Where issue listings come from
    #[arg(long, env = "ISSUE_SOURCE", value_enum, default_value_t = IssueSourceKind::Github)]
    pub issue_source: IssueSourceKind,

    /// Base URL of the GitHub REST API
    #[arg(long, env = "GITHUB_API_BASE", default_value = github::DEFAULT_API_BASE)]
    pub github_api_base: String,

    /// Optional GitHub token (raises the rate limit)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Directory holding cached results
    #[arg(long, env = "CACHE_DIR", default_value = "cache")]
    pub cache_dir: PathBuf,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(flatten)]
    pub timeouts: TimeoutArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API and the static page
    Serve {
        #[arg(long, env = "HOST", default_value = "127.0.0.1")]
        host: String,

        #[arg(long, env = "PORT", default_value_t = 8844)]
        port: u16,
    },
    /// Fetch issues and analyze one of them, printing the report as JSON
    Analyze {
        /// Repository URL, e.g. https://github.com/owner/repo
        #[arg(long)]
        repo_url: String,

        /// Issue number to analyze
        #[arg(long)]
        issue: u64,

        /// Ignore any cached issue listing
        #[arg(long)]
        refresh: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IssueSourceKind {
    /// GitHub REST API
    Github,
    /// A remote session that lists the issues
    Devin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Per-phase polling budgets in seconds.
#[derive(Debug, Clone, clap::Args)]
pub struct TimeoutArgs {
    #[arg(long, env = "ISSUE_FETCH_TIMEOUT_SECS", default_value_t = 120)]
    pub issue_fetch_timeout_secs: u64,

    #[arg(long, env = "SCAN_TIMEOUT_SECS", default_value_t = 180)]
    pub scan_timeout_secs: u64,

    #[arg(long, env = "TARGETED_ANALYSIS_TIMEOUT_SECS", default_value_t = 300)]
    pub targeted_analysis_timeout_secs: u64,

    #[arg(long, env = "FULL_ANALYSIS_TIMEOUT_SECS", default_value_t = 600)]
    pub full_analysis_timeout_secs: u64,

    #[arg(long, env = "PLANNING_TIMEOUT_SECS", default_value_t = 600)]
    pub planning_timeout_secs: u64,

    #[arg(long, env = "EXECUTION_TIMEOUT_SECS", default_value_t = 1800)]
    pub execution_timeout_secs: u64,
}

impl TimeoutArgs {
    pub fn phase_timeouts(&self) -> PhaseTimeouts {
        PhaseTimeouts {
            issue_fetch: Duration::from_secs(self.issue_fetch_timeout_secs),
            scan: Duration::from_secs(self.scan_timeout_secs),
            targeted_analysis: Duration::from_secs(self.targeted_analysis_timeout_secs),
            full_analysis: Duration::from_secs(self.full_analysis_timeout_secs),
            planning: Duration::from_secs(self.planning_timeout_secs),
            execution: Duration::from_secs(self.execution_timeout_secs),
        }
    }
}

/// Settings checked and converted into the shapes the crates expect.
#[derive(Debug, Clone)]
pub struct Settings {
    pub devin: DevinConfig,
    pub github: GithubConfig,
    pub issue_source: IssueSourceKind,
    pub cache_dir: PathBuf,
    pub timeouts: PhaseTimeouts,
}

impl Cli {
    /// Validates everything that can be checked without touching the network.
    pub fn settings(&self) -> Result<Settings, AnalyzerError> {
        if self.devin_api_key.trim().is_empty() {
            return Err(AnalyzerError::configuration("DEVIN_API_KEY is required"));
        }
        for (name, url) in [
            ("DEVIN_API_BASE", &self.devin_api_base),
            ("GITHUB_API_BASE", &self.github_api_base),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AnalyzerError::configuration(format!(
                    "{name} must be an http(s) URL, got '{url}'"
                )));
            }
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err(AnalyzerError::configuration("CACHE_DIR must not be empty"));
        }
        let timeouts = self.timeouts.phase_timeouts();
        timeouts.validate()?;

        let mut devin = DevinConfig::new(self.devin_api_key.clone());
        devin.api_base = self.devin_api_base.clone();

        let github = GithubConfig {
            api_base: self.github_api_base.clone(),
            token: self.github_token.clone(),
            ..GithubConfig::default()
        };

        Ok(Settings {
            devin,
            github,
            issue_source: self.issue_source,
            cache_dir: self.cache_dir.clone(),
            timeouts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["issue-analyzer", "--devin-api-key", "k"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_phase_budgets() {
        let cli = parse(&["serve"]);
        let settings = cli.settings().unwrap();
        assert_eq!(settings.timeouts, PhaseTimeouts::default());
        assert_eq!(settings.issue_source, IssueSourceKind::Github);
        assert_eq!(settings.devin.api_base, devin::DEFAULT_API_BASE);
        assert_eq!(settings.cache_dir, PathBuf::from("cache"));
        match cli.command {
            Command::Serve { host, port } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 8844);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn analyze_subcommand() {
        let cli = parse(&[
            "--issue-source",
            "devin",
            "analyze",
            "--repo-url",
            "https://github.com/octocat/hello",
            "--issue",
            "7",
            "--refresh",
        ]);
        assert_eq!(cli.issue_source, IssueSourceKind::Devin);
        match cli.command {
            Command::Analyze {
                repo_url,
                issue,
                refresh,
            } => {
                assert_eq!(repo_url, "https://github.com/octocat/hello");
                assert_eq!(issue, 7);
                assert!(refresh);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = parse(&["--scan-timeout-secs", "0", "serve"])
            .settings()
            .unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
    }

    #[test]
    fn blank_api_key_is_rejected() {
        let cli = Cli::try_parse_from(["issue-analyzer", "--devin-api-key", "  ", "serve"]).unwrap();
        assert!(cli.settings().is_err());
    }

    #[test]
    fn api_base_must_be_http() {
        let err = parse(&["--github-api-base", "ftp://example.com", "serve"])
            .settings()
            .unwrap_err();
        assert!(err.to_string().contains("GITHUB_API_BASE"));
    }

    #[test]
    fn unknown_issue_source_fails_to_parse() {
        let result = Cli::try_parse_from([
            "issue-analyzer",
            "--devin-api-key",
            "k",
            "--issue-source",
            "gitlab",
            "serve",
        ]);
        assert!(result.is_err());
    }
}
