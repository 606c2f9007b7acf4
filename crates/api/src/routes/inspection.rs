use axum::routing::get;
use axum::Router;

use crate::handlers::inspection;
use crate::state::AppState;

/// Routes mounted at `/inspections`.
///
/// ```text
/// GET    /capture-settings    -> capture_settings
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/capture-settings", get(inspection::capture_settings))
}
