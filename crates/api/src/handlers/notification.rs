//! Handlers for the `/notifications` resource.
//!
//! All endpoints require authentication via [`AuthUser`] and only ever see
//! the caller's own notifications.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::Stream;
use serde::{Deserialize, Serialize};
use slf_core::types::DbId;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Interval between keep-alive comments on the live stream.
const KEEP_ALIVE_SECS: u64 = 15;

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    /// If `true`, return only unread notifications. Defaults to `false`.
    pub unread_only: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

/// GET /api/v1/notifications
///
/// Newest first.
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<impl IntoResponse> {
    let notifications = state
        .workflow
        .inbox
        .list(&auth.actor(), params.unread_only.unwrap_or(false))
        .await?;
    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// POST /api/v1/notifications/{id}/read
///
/// Returns 204 No Content on success, or 404 if the notification does not
/// belong to the caller.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state
        .workflow
        .inbox
        .mark_read(notification_id, &auth.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let count = state.workflow.inbox.unread_count(&auth.actor()).await?;
    Ok(Json(DataResponse {
        data: UnreadCount { count },
    }))
}

/// GET /api/v1/notifications/stream
///
/// Server-sent events for everything addressed to the caller from the
/// moment of subscription. The SSE event name is the notification kind.
/// Missed events are not replayed; clients reconcile through
/// `GET /notifications`.
pub async fn stream_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let user_id = auth.user_id;
    let receiver = state.workflow.bus().subscribe();
    tracing::debug!(user_id, "Notification stream opened");

    let stream = BroadcastStream::new(receiver).filter_map(move |result| match result {
        Ok(event) if event.is_for(user_id) => match Event::default()
            .event(event.event_type.clone())
            .json_data(&event)
        {
            Ok(sse) => Some(Ok::<_, Infallible>(sse)),
            Err(err) => {
                tracing::warn!(user_id, error = %err, "Dropping unserializable event");
                None
            }
        },
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(user_id, skipped, "Notification stream lagged");
            None
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("ping"),
    )
}
