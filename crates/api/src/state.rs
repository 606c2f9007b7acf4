use std::sync::Arc;

use slf_workflow::Workflow;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the workflow services hold `Arc`s internally.
#[derive(Clone)]
pub struct AppState {
    /// Workflow services over the configured entity store.
    pub workflow: Workflow,
    pub config: Arc<ServerConfig>,
    /// Set when the store is PostgreSQL; the health check pings it.
    pub pool: Option<slf_db::DbPool>,
}
