//! Route definitions for the `/schedules` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{checklist, schedule};
use crate::state::AppState;

/// Routes mounted at `/schedules`.
///
/// ```text
/// GET    /{id}                        -> get_schedule
/// POST   /{id}/assign                 -> assign_schedule
/// POST   /{id}/start                  -> start_schedule
/// POST   /{id}/complete               -> complete_schedule
/// POST   /{id}/cancel                 -> cancel_schedule
/// GET    /{id}/location               -> get_location
/// GET    /{id}/checklist              -> list_responses
/// PUT    /{id}/checklist/{item_id}    -> save_response
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(schedule::get_schedule))
        .route("/{id}/assign", post(schedule::assign_schedule))
        .route("/{id}/start", post(schedule::start_schedule))
        .route("/{id}/complete", post(schedule::complete_schedule))
        .route("/{id}/cancel", post(schedule::cancel_schedule))
        .route("/{id}/location", get(schedule::get_location))
        .route("/{id}/checklist", get(checklist::list_responses))
        .route("/{id}/checklist/{item_id}", put(checklist::save_response))
}
