//! Handlers for inspection and meeting schedules.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use slf_core::geotag::LocationCapture;
use slf_core::status::{ScheduleStatus, ScheduleType};
use slf_core::types::{DbId, Timestamp};
use slf_db::models::schedule::CreateSchedule;
use slf_workflow::TransitionRequest;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body for `POST /projects/{id}/schedules`.
#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    pub schedule_type: ScheduleType,
    pub scheduled_date: Timestamp,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub user_id: DbId,
    pub expected_version: Option<i32>,
}

/// Body for `POST /schedules/{id}/start`.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    /// Omitted for meetings.
    pub location: Option<LocationCapture>,
    pub expected_version: Option<i32>,
}

/// Body for `/complete` and `/cancel`. Cancelling requires `notes`.
#[derive(Debug, Default, Deserialize)]
pub struct CloseRequest {
    pub notes: Option<String>,
    pub expected_version: Option<i32>,
}

// ---------------------------------------------------------------------------
// Schedules
// ---------------------------------------------------------------------------

/// POST /api/v1/projects/{id}/schedules
pub async fn create_schedule(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<CreateScheduleRequest>,
) -> AppResult<impl IntoResponse> {
    let schedule = state
        .workflow
        .schedules
        .create_schedule(
            CreateSchedule {
                project_id,
                schedule_type: input.schedule_type,
                scheduled_date: input.scheduled_date,
                notes: input.notes,
                created_by: auth.user_id,
            },
            auth.actor(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: schedule })))
}

/// GET /api/v1/projects/{id}/schedules
pub async fn list_schedules(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let schedules = state
        .workflow
        .schedules
        .list_schedules(project_id, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: schedules }))
}

/// GET /api/v1/schedules/{id}
pub async fn get_schedule(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let schedule = state
        .workflow
        .schedules
        .get_schedule(id, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: schedule }))
}

/// GET /api/v1/schedules/{id}/location
///
/// `data` is `null` until the inspection has started.
pub async fn get_location(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let location = state
        .workflow
        .schedules
        .get_location(id, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: location }))
}

/// POST /api/v1/schedules/{id}/assign
pub async fn assign_schedule(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AssignRequest>,
) -> AppResult<impl IntoResponse> {
    let schedule = state
        .workflow
        .assignments
        .assign(id, input.user_id, auth.actor(), input.expected_version)
        .await?;
    Ok(Json(DataResponse { data: schedule }))
}

/// POST /api/v1/schedules/{id}/start
pub async fn start_schedule(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<StartRequest>,
) -> AppResult<impl IntoResponse> {
    let schedules = &state.workflow.schedules;
    let schedule = match input.location {
        Some(capture) => {
            schedules
                .start_inspection(id, auth.actor(), capture, input.expected_version)
                .await?
        }
        None => {
            let request = TransitionRequest {
                target: ScheduleStatus::InProgress,
                actor: auth.actor(),
                notes: None,
                expected_version: input.expected_version,
            };
            schedules.request_transition(id, request).await?
        }
    };
    Ok(Json(DataResponse { data: schedule }))
}

/// POST /api/v1/schedules/{id}/complete
pub async fn complete_schedule(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CloseRequest>,
) -> AppResult<impl IntoResponse> {
    let schedule = state
        .workflow
        .schedules
        .complete_schedule(id, auth.actor(), input.notes, input.expected_version)
        .await?;
    Ok(Json(DataResponse { data: schedule }))
}

/// POST /api/v1/schedules/{id}/cancel
pub async fn cancel_schedule(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CloseRequest>,
) -> AppResult<impl IntoResponse> {
    let schedule = state
        .workflow
        .schedules
        .cancel_schedule(id, auth.actor(), input.notes, input.expected_version)
        .await?;
    Ok(Json(DataResponse { data: schedule }))
}
