use axum::routing::get;
use axum::Router;

use crate::handlers::checklist;
use crate::state::AppState;

/// Routes mounted at `/checklist-items`.
///
/// ```text
/// GET    /    -> list_items
/// POST   /    -> create_item
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(checklist::list_items).post(checklist::create_item))
}
