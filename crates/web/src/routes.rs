//! Route definitions for the HTTP API.

use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Default maximum request body size (1 MB).
const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Build the axum router with every route.
///
/// No request timeout layer; each remote session is bounded by its phase budget.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/fetch-issues", post(handlers::fetch_issues))
        .route("/analyze-issue", post(handlers::analyze_issue))
        .route(
            "/analyze-multiple-issues",
            post(handlers::analyze_multiple_issues),
        )
        .route("/execute", post(handlers::execute));

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(DEFAULT_BODY_LIMIT))
}
