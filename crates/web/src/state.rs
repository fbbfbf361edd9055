//! Shared application state for the axum server.

use std::sync::Arc;

use nodes::Workflows;

/// Shared state accessible to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    workflows: Arc<Workflows>,
}

impl AppState {
    pub fn new(workflows: Workflows) -> Self {
        Self {
            workflows: Arc::new(workflows),
        }
    }

    pub fn workflows(&self) -> &Workflows {
        &self.workflows
    }
}
