//! Location capture settings for the field app.

use axum::Json;
use serde::Serialize;
use slf_core::geotag::{GPS_HIGH_ACCURACY, GPS_MAXIMUM_AGE_MS, GPS_TIMEOUT_SECS, MAX_MANUAL_NOTE_LENGTH};

use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;

/// How the client should attempt a GPS fix before falling back to a
/// manual location note.
#[derive(Debug, Serialize)]
pub struct CaptureSettings {
    pub timeout_secs: u64,
    pub high_accuracy: bool,
    /// `0` demands a fresh fix.
    pub maximum_age_ms: u64,
    pub max_manual_note_length: usize,
}

/// GET /api/v1/inspections/capture-settings
pub async fn capture_settings(_auth: AuthUser) -> Json<DataResponse<CaptureSettings>> {
    Json(DataResponse {
        data: CaptureSettings {
            timeout_secs: GPS_TIMEOUT_SECS,
            high_accuracy: GPS_HIGH_ACCURACY,
            maximum_age_ms: GPS_MAXIMUM_AGE_MS,
            max_manual_note_length: MAX_MANUAL_NOTE_LENGTH,
        },
    })
}
