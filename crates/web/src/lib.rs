//! Issue analyzer HTTP API.
//!
//! Exposes the [`nodes::Workflows`] facade over HTTP using axum, plus a static
//! page that calls the endpoints directly.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `/` | static page |
//! | GET | `/health` | liveness and version |
//! | POST | `/api/fetch-issues` | list (and cache) repository issues |
//! | POST | `/api/analyze-issue` | scan, feasibility and plan for one issue |
//! | POST | `/api/analyze-multiple-issues` | the same for several issues concurrently |
//! | POST | `/api/execute` | implement the plan and open a pull request |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Request decoding, status-code mapping and middleware
//! live here; orchestration is delegated to [`nodes`].

mod handlers;
mod routes;
mod state;

pub use handlers::{ApiError, ErrorResponse};
pub use routes::build_router;
pub use state::AppState;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8844,
        }
    }
}

/// Serves the API until SIGINT or SIGTERM.
pub async fn serve(state: AppState, config: ServerConfig) -> std::io::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("issue analyzer listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("issue analyzer shut down gracefully");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM. A handler that cannot be installed never
/// resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { tracing::info!("Received SIGINT, shutting down..."); }
        _ = terminate => { tracing::info!("Received SIGTERM, shutting down..."); }
    }
}
