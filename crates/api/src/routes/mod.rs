pub mod checklist;
pub mod document;
pub mod health;
pub mod inspection;
pub mod notification;
pub mod project;
pub mod report;
pub mod schedule;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /projects                                        create, list
/// /projects/{id}                                   get
/// /projects/{id}/transition                        request transition (POST)
/// /projects/{id}/transitions                       audit trail
/// /projects/{id}/team                              list, add member
/// /projects/{id}/documents                         list, upload
/// /projects/{id}/document-completeness             required categories
/// /projects/{id}/schedules                         list, create
/// /projects/{id}/reports                           list, create
///
/// /documents                                       unattached client upload (POST)
/// /documents/{id}/verify                           verify or reject (POST)
///
/// /schedules/{id}                                  get
/// /schedules/{id}/assign                           assign (POST)
/// /schedules/{id}/start                            start with location (POST)
/// /schedules/{id}/complete                         complete (POST)
/// /schedules/{id}/cancel                           cancel with notes (POST)
/// /schedules/{id}/location                         captured location
/// /schedules/{id}/checklist                        answers
/// /schedules/{id}/checklist/{item_id}              save answer (PUT)
///
/// /checklist-items                                 list, create
///
/// /reports/{id}                                    get
/// /reports/{id}/transition                         request transition (POST)
/// /reports/{id}/findings                           select findings (PUT)
/// /reports/{id}/review                             open approval chain (POST)
/// /reports/{id}/decision                           record step decision (POST)
/// /reports/{id}/chains                             chain history
///
/// /notifications                                  list
/// /notifications/{id}/read                         mark read (POST)
/// /notifications/unread-count                      count
/// /notifications/stream                            live events (SSE)
///
/// /inspections/capture-settings                    GPS capture parameters
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/projects", project::router())
        .nest("/documents", document::router())
        .nest("/schedules", schedule::router())
        .nest("/checklist-items", checklist::router())
        .nest("/reports", report::router())
        .nest("/notifications", notification::router())
        .nest("/inspections", inspection::router())
}
