//! Handlers for the checklist catalog and inspection answers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use slf_core::types::DbId;
use slf_db::models::checklist::CreateChecklistItem;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body for `PUT /schedules/{id}/checklist/{item_id}`.
#[derive(Debug, Deserialize)]
pub struct SaveResponseRequest {
    pub payload: serde_json::Value,
    #[serde(default)]
    pub submit: bool,
}

/// GET /api/v1/checklist-items
pub async fn list_items(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let items = state.workflow.checklists.list_items().await?;
    Ok(Json(DataResponse { data: items }))
}

/// POST /api/v1/checklist-items
pub async fn create_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateChecklistItem>,
) -> AppResult<impl IntoResponse> {
    let item = state
        .workflow
        .checklists
        .create_item(input, auth.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

/// PUT /api/v1/schedules/{id}/checklist/{item_id}
///
/// Saving again replaces the previous answer.
pub async fn save_response(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((schedule_id, item_id)): Path<(DbId, DbId)>,
    Json(input): Json<SaveResponseRequest>,
) -> AppResult<impl IntoResponse> {
    let response = state
        .workflow
        .checklists
        .save_response(schedule_id, item_id, auth.actor(), input.payload, input.submit)
        .await?;
    Ok(Json(DataResponse { data: response }))
}

/// GET /api/v1/schedules/{id}/checklist
pub async fn list_responses(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(schedule_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let responses = state
        .workflow
        .checklists
        .list_responses(schedule_id, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: responses }))
}
