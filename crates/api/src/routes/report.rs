//! Route definitions for the `/reports` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::report;
use crate::state::AppState;

/// Routes mounted at `/reports`.
///
/// ```text
/// GET    /{id}               -> get_report
/// POST   /{id}/transition    -> transition_report
/// PUT    /{id}/findings      -> select_findings
/// POST   /{id}/review        -> submit_for_review
/// POST   /{id}/decision      -> record_decision
/// GET    /{id}/chains        -> list_chains
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(report::get_report))
        .route("/{id}/transition", post(report::transition_report))
        .route("/{id}/findings", put(report::select_findings))
        .route("/{id}/review", post(report::submit_for_review))
        .route("/{id}/decision", post(report::record_decision))
        .route("/{id}/chains", get(report::list_chains))
}
