//! Handlers for project documents and their verification.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use slf_core::approval::Decision;
use slf_core::types::DbId;
use slf_workflow::UploadDocument;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body for `POST /documents/{id}/verify`. Rejections need `notes`.
#[derive(Debug, Deserialize)]
pub struct VerifyDocumentRequest {
    pub decision: Decision,
    pub notes: Option<String>,
    pub expected_version: Option<i32>,
}

/// GET /api/v1/projects/{id}/documents
pub async fn list_documents(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let documents = state
        .workflow
        .documents
        .list_documents(project_id, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: documents }))
}

/// POST /api/v1/projects/{id}/documents
///
/// Records upload metadata for one category. Uploading again over a
/// rejected document starts its next revision.
pub async fn upload_document(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<UploadDocument>,
) -> AppResult<impl IntoResponse> {
    let document = state
        .workflow
        .documents
        .upload_document(Some(project_id), input, auth.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: document })))
}

/// POST /api/v1/documents
///
/// A client's submission that is not attached to a project yet.
pub async fn submit_unattached(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UploadDocument>,
) -> AppResult<impl IntoResponse> {
    let document = state
        .workflow
        .documents
        .upload_document(None, input, auth.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: document })))
}

/// GET /api/v1/projects/{id}/document-completeness
pub async fn document_completeness(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let completeness = state
        .workflow
        .documents
        .document_completeness(project_id, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: completeness }))
}

/// POST /api/v1/documents/{id}/verify
pub async fn verify_document(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<VerifyDocumentRequest>,
) -> AppResult<impl IntoResponse> {
    let document = state
        .workflow
        .documents
        .verify_document(
            id,
            input.decision,
            input.notes.as_deref(),
            auth.actor(),
            input.expected_version,
        )
        .await?;
    Ok(Json(DataResponse { data: document }))
}
