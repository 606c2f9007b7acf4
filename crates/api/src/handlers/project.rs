//! Handlers for the `/projects` resource and its team.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use slf_core::roles::Role;
use slf_core::status::{ApplicationType, ProjectStatus};
use slf_core::types::DbId;
use slf_db::models::project::{CreateProject, ProjectFilter};
use slf_workflow::TransitionRequest;

use crate::error::{AppError, AppResult};
use crate::handlers::report::DecisionRequest;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body for `POST /projects`.
///
/// `client_id` defaults to the caller when the caller is a client.
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub city: String,
    pub application_type: ApplicationType,
    pub client_id: Option<DbId>,
    pub project_lead_id: Option<DbId>,
    pub admin_lead_id: Option<DbId>,
}

/// Body shared by the `/transition` endpoints.
#[derive(Debug, Deserialize)]
pub struct TransitionBody<S> {
    pub target: S,
    pub notes: Option<String>,
    pub expected_version: Option<i32>,
}

impl<S> TransitionBody<S> {
    pub fn into_request(self, auth: &AuthUser) -> TransitionRequest<S> {
        TransitionRequest {
            target: self.target,
            actor: auth.actor(),
            notes: self.notes,
            expected_version: self.expected_version,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddTeamMemberRequest {
    pub user_id: DbId,
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// POST /api/v1/projects
pub async fn create_project(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateProjectRequest>,
) -> AppResult<impl IntoResponse> {
    let client_id = match (input.client_id, auth.role) {
        (Some(id), _) => id,
        (None, Role::Client) => auth.user_id,
        (None, _) => return Err(AppError::BadRequest("client_id is required".into())),
    };

    let project = state
        .workflow
        .engine
        .create_project(
            CreateProject {
                name: input.name,
                address: input.address,
                city: input.city,
                application_type: input.application_type,
                client_id,
                project_lead_id: input.project_lead_id,
                admin_lead_id: input.admin_lead_id,
            },
            auth.actor(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/projects
///
/// Projects visible to the caller, optionally filtered by `status` and
/// `application_type`.
pub async fn list_projects(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ProjectFilter>,
) -> AppResult<impl IntoResponse> {
    let projects = state
        .workflow
        .engine
        .list_projects(&filter, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: projects }))
}

/// GET /api/v1/projects/{id}
pub async fn get_project(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let project = state.workflow.engine.get_project(id, &auth.actor()).await?;
    Ok(Json(DataResponse { data: project }))
}

/// POST /api/v1/projects/{id}/transition
pub async fn transition_project(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<TransitionBody<ProjectStatus>>,
) -> AppResult<impl IntoResponse> {
    let project = state
        .workflow
        .engine
        .request_project_transition(id, body.into_request(&auth))
        .await?;
    Ok(Json(DataResponse { data: project }))
}

/// GET /api/v1/projects/{id}/transitions
///
/// Audit trail, oldest first.
pub async fn list_transitions(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let history = state
        .workflow
        .engine
        .project_history(id, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: history }))
}

// ---------------------------------------------------------------------------
// Review chain
// ---------------------------------------------------------------------------

/// POST /api/v1/projects/{id}/decision
///
/// Signs the next pending step of the project's approval chain.
pub async fn record_decision(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<DecisionRequest>,
) -> AppResult<impl IntoResponse> {
    let result = state
        .workflow
        .approvals
        .record_project_decision(
            id,
            input.role.unwrap_or(auth.role),
            input.decision,
            input.notes.as_deref(),
            auth.actor(),
        )
        .await?;
    Ok(Json(DataResponse { data: result }))
}

/// GET /api/v1/projects/{id}/chains
pub async fn list_chains(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let chains = state
        .workflow
        .approvals
        .list_project_chains(id, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: chains }))
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

/// GET /api/v1/projects/{id}/team
pub async fn list_team(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let team = state
        .workflow
        .assignments
        .list_team(id, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: team }))
}

/// POST /api/v1/projects/{id}/team
///
/// Adds a user to the team and returns the full team.
pub async fn add_team_member(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AddTeamMemberRequest>,
) -> AppResult<impl IntoResponse> {
    let team = state
        .workflow
        .assignments
        .add_team_member(id, input.user_id, auth.actor())
        .await?;
    Ok(Json(DataResponse { data: team }))
}
