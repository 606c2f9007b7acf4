use axum::routing::post;
use axum::Router;

use crate::handlers::document;
use crate::state::AppState;

/// Routes mounted at `/documents`.
///
/// ```text
/// POST   /                 -> submit_unattached
/// POST   /{id}/verify      -> verify_document
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(document::submit_unattached))
        .route("/{id}/verify", post(document::verify_document))
}
