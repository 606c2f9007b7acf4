//! Route definitions for the `/projects` resource and its sub-resources.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{document, project, report, schedule};
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /                            -> list_projects
/// POST   /                            -> create_project
/// GET    /{id}                        -> get_project
/// POST   /{id}/transition             -> transition_project
/// GET    /{id}/transitions            -> list_transitions
/// POST   /{id}/decision               -> record_decision
/// GET    /{id}/chains                 -> list_chains
/// GET    /{id}/team                   -> list_team
/// POST   /{id}/team                   -> add_team_member
/// GET    /{id}/documents              -> list_documents
/// POST   /{id}/documents              -> upload_document
/// GET    /{id}/document-completeness  -> document_completeness
/// GET    /{id}/schedules              -> list_schedules
/// POST   /{id}/schedules              -> create_schedule
/// GET    /{id}/reports                -> list_reports
/// POST   /{id}/reports                -> create_report
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(project::list_projects).post(project::create_project))
        .route("/{id}", get(project::get_project))
        .route("/{id}/transition", post(project::transition_project))
        .route("/{id}/transitions", get(project::list_transitions))
        .route("/{id}/decision", post(project::record_decision))
        .route("/{id}/chains", get(project::list_chains))
        .route(
            "/{id}/team",
            get(project::list_team).post(project::add_team_member),
        )
        .route(
            "/{id}/documents",
            get(document::list_documents).post(document::upload_document),
        )
        .route(
            "/{id}/document-completeness",
            get(document::document_completeness),
        )
        .route(
            "/{id}/schedules",
            get(schedule::list_schedules).post(schedule::create_schedule),
        )
        .route(
            "/{id}/reports",
            get(report::list_reports).post(report::create_report),
        )
}
