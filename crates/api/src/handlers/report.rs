//! Handlers for inspection reports and their approval chains.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use slf_core::approval::{ChainDefinition, Decision};
use slf_core::roles::Role;
use slf_core::status::ReportStatus;
use slf_core::types::DbId;
use slf_db::models::report::CreateReport;

use crate::error::AppResult;
use crate::handlers::project::TransitionBody;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body for `POST /projects/{id}/reports`.
#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub schedule_id: Option<DbId>,
    pub file_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectFindingsRequest {
    /// Checklist response ids from the report's inspection.
    pub findings: Vec<DbId>,
    pub expected_version: Option<i32>,
}

/// Body for `POST /reports/{id}/review`. Without `chain` the configured
/// default applies.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitForReviewRequest {
    pub chain: Option<ChainDefinition>,
    pub expected_version: Option<i32>,
}

/// Body for `POST /reports/{id}/decision` and `POST /projects/{id}/decision`.
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// Role the reviewer signs as. Defaults to the caller's role.
    pub role: Option<Role>,
    pub decision: Decision,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// POST /api/v1/projects/{id}/reports
pub async fn create_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<CreateReportRequest>,
) -> AppResult<impl IntoResponse> {
    let report = state
        .workflow
        .reports
        .create_report(
            CreateReport {
                project_id,
                schedule_id: input.schedule_id,
                file_ref: input.file_ref,
                author_id: auth.user_id,
            },
            auth.actor(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: report })))
}

/// GET /api/v1/projects/{id}/reports
pub async fn list_reports(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let reports = state
        .workflow
        .reports
        .list_reports(project_id, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: reports }))
}

/// GET /api/v1/reports/{id}
pub async fn get_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let report = state.workflow.reports.get_report(id, &auth.actor()).await?;
    Ok(Json(DataResponse { data: report }))
}

/// POST /api/v1/reports/{id}/transition
pub async fn transition_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<TransitionBody<ReportStatus>>,
) -> AppResult<impl IntoResponse> {
    let report = state
        .workflow
        .engine
        .request_report_transition(id, body.into_request(&auth))
        .await?;
    Ok(Json(DataResponse { data: report }))
}

/// PUT /api/v1/reports/{id}/findings
pub async fn select_findings(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SelectFindingsRequest>,
) -> AppResult<impl IntoResponse> {
    let report = state
        .workflow
        .reports
        .select_findings(id, input.findings, auth.actor(), input.expected_version)
        .await?;
    Ok(Json(DataResponse { data: report }))
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

/// POST /api/v1/reports/{id}/review
///
/// Opens an approval chain and moves the report to `under_review`.
pub async fn submit_for_review(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SubmitForReviewRequest>,
) -> AppResult<impl IntoResponse> {
    let review = state
        .workflow
        .approvals
        .submit_for_review(id, input.chain, auth.actor(), input.expected_version)
        .await?;
    Ok(Json(DataResponse { data: review }))
}

/// POST /api/v1/reports/{id}/decision
pub async fn record_decision(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<DecisionRequest>,
) -> AppResult<impl IntoResponse> {
    let result = state
        .workflow
        .approvals
        .record_decision(
            id,
            input.role.unwrap_or(auth.role),
            input.decision,
            input.notes.as_deref(),
            auth.actor(),
        )
        .await?;
    Ok(Json(DataResponse { data: result }))
}

/// GET /api/v1/reports/{id}/chains
///
/// Every chain the report has been through, with its steps.
pub async fn list_chains(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let chains = state
        .workflow
        .approvals
        .list_chains(id, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: chains }))
}
