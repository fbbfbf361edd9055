//! Issue analyzer entry point.
//!
//! This binary is the composition root for the entire system:
//!
//! 1. **Parse configuration**: flags with environment fallbacks, after loading
//!    an optional `.env` file. Invalid settings stop the process before any
//!    listener or client starts.
//! 2. **Wire observability**: `tracing-subscriber` with an env filter, a JSON
//!    or pretty fmt layer, and an OTLP exporter when one is configured.
//! 3. **Construct infrastructure**: the session client, the issue source
//!    (GitHub or a remote session) and the file cache, injected into
//!    [`nodes::Workflows`].
//! 4. **Select run mode**: `serve` runs the HTTP API; `analyze` fetches issues,
//!    analyzes one and prints the report.

use std::sync::Arc;

use anyhow::Context;
use cache::JsonFileCache;
use clap::Parser;
use devin::DevinClient;
use github::GithubClient;
use nodes::{DevinIssueSource, SessionManager, Workflows};
use pipeline::{IssueNumber, IssueSource};
use web::{AppState, ServerConfig};

mod config;
mod telemetry;

use config::{Cli, Command, IssueSourceKind, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = cli.settings().context("invalid configuration")?;
    let telemetry = telemetry::init(cli.log_format)?;

    let result = run(cli.command, settings).await;
    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "issue analyzer exited with an error");
    }
    telemetry.shutdown();
    result
}

async fn run(command: Command, settings: Settings) -> anyhow::Result<()> {
    let workflows = build_workflows(&settings)?;

    match command {
        Command::Serve { host, port } => {
            tracing::info!(
                cache_dir = %settings.cache_dir.display(),
                issue_source = ?settings.issue_source,
                "starting issue analyzer"
            );
            web::serve(AppState::new(workflows), ServerConfig { host, port })
                .await
                .context("HTTP server failed")?;
        }
        Command::Analyze {
            repo_url,
            issue,
            refresh,
        } => {
            let listing = workflows.fetch_issues(&repo_url, refresh).await?;
            tracing::info!(
                repo = %listing.repo_url,
                issues = listing.issues.len(),
                "issues fetched"
            );
            let report = workflows
                .analyze_issue(&repo_url, IssueNumber::new(issue))
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn build_workflows(settings: &Settings) -> anyhow::Result<Workflows> {
    let client = DevinClient::new(settings.devin.clone())?;
    let sessions = SessionManager::new(Arc::new(client), settings.timeouts);

    let source: Arc<dyn IssueSource> = match settings.issue_source {
        IssueSourceKind::Github => Arc::new(GithubClient::new(settings.github.clone())?),
        IssueSourceKind::Devin => Arc::new(DevinIssueSource::new(sessions.clone())),
    };
    let cache = Arc::new(JsonFileCache::new(&settings.cache_dir));

    Ok(Workflows::new(sessions, source, cache))
}
