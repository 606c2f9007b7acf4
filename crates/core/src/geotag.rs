//! Location capture for inspection starts.
//!
//! The field device tries a one-shot high-accuracy GPS fix. When the fix
//! fails (permission denied, no position, timeout) the inspector types a
//! manual note instead. A capture is exactly one of the two.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::define_label_enum;

/// Client-side GPS fix timeout.
pub const GPS_TIMEOUT_SECS: u64 = 10;

/// Whether the client must request a high-accuracy fix.
pub const GPS_HIGH_ACCURACY: bool = true;

/// Cached positions are not accepted.
pub const GPS_MAXIMUM_AGE_MS: u64 = 0;

/// Longest manual location note accepted.
pub const MAX_MANUAL_NOTE_LENGTH: usize = 2_000;

define_label_enum! {
    /// Why the device could not produce a GPS fix.
    GpsFailure {
        PermissionDenied = "permission_denied",
        PositionUnavailable = "position_unavailable",
        Timeout = "timeout",
    }
}

define_label_enum! {
    /// How a location was captured.
    LocationKind {
        Gps = "gps",
        Manual = "manual",
    }
}

/// Location recorded when an inspection starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocationCapture {
    Gps {
        latitude: f64,
        longitude: f64,
        accuracy_m: Option<f64>,
    },
    Manual {
        note: String,
        #[serde(default)]
        gps_failure: Option<GpsFailure>,
    },
}

impl LocationCapture {
    pub fn kind(&self) -> LocationKind {
        match self {
            LocationCapture::Gps { .. } => LocationKind::Gps,
            LocationCapture::Manual { .. } => LocationKind::Manual,
        }
    }

    /// Check coordinates are on the globe and manual notes are not blank.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            LocationCapture::Gps {
                latitude,
                longitude,
                accuracy_m,
            } => {
                validate_coordinates(*latitude, *longitude)?;
                if let Some(acc) = accuracy_m {
                    if !acc.is_finite() || *acc < 0.0 {
                        return Err(CoreError::Validation(format!(
                            "GPS accuracy must be a non-negative number of metres, got {acc}"
                        )));
                    }
                }
                Ok(())
            }
            LocationCapture::Manual { note, .. } => {
                if note.trim().is_empty() {
                    return Err(CoreError::MissingPayload(
                        "manual location capture requires a note".to_string(),
                    ));
                }
                if note.len() > MAX_MANUAL_NOTE_LENGTH {
                    return Err(CoreError::Validation(format!(
                        "Manual location note exceeds {MAX_MANUAL_NOTE_LENGTH} characters"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Validate a latitude / longitude pair in decimal degrees.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), CoreError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(CoreError::Validation(format!(
            "Latitude {latitude} is outside -90..=90"
        )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(CoreError::Validation(format!(
            "Longitude {longitude} is outside -180..=180"
        )));
    }
    Ok(())
}
