//! Schedule and inspection location models.

use serde::{Deserialize, Serialize};
use slf_core::geotag::{GpsFailure, LocationCapture, LocationKind};
use slf_core::status::{ScheduleStatus, ScheduleType};
use slf_core::types::{DbId, Timestamp};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use super::transition::NewTransition;
use super::{label, optional_label};

/// A row from the `schedules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Schedule {
    pub id: DbId,
    pub project_id: DbId,
    #[sqlx(try_from = "String")]
    pub schedule_type: ScheduleType,
    pub scheduled_date: Timestamp,
    pub assigned_to: Option<DbId>,
    #[sqlx(try_from = "String")]
    pub status: ScheduleStatus,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub notes: Option<String>,
    pub created_by: DbId,
    pub version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a schedule entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSchedule {
    pub project_id: DbId,
    pub schedule_type: ScheduleType,
    pub scheduled_date: Timestamp,
    pub notes: Option<String>,
    #[serde(skip)]
    pub created_by: DbId,
}

/// A status change that does not touch the location.
#[derive(Debug, Clone)]
pub struct ScheduleTransition {
    pub to: ScheduleStatus,
    pub audit: NewTransition,
}

/// A row from the `inspection_locations` table; one per started inspection.
#[derive(Debug, Clone, Serialize)]
pub struct InspectionLocation {
    pub id: DbId,
    pub schedule_id: DbId,
    pub kind: LocationKind,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy_m: Option<f64>,
    pub note: Option<String>,
    pub gps_failure: Option<GpsFailure>,
    pub captured_by: DbId,
    pub captured_at: Timestamp,
}

impl<'r> FromRow<'r, PgRow> for InspectionLocation {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            schedule_id: row.try_get("schedule_id")?,
            kind: label(row, "kind")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            accuracy_m: row.try_get("accuracy_m")?,
            note: row.try_get("note")?,
            gps_failure: optional_label(row, "gps_failure")?,
            captured_by: row.try_get("captured_by")?,
            captured_at: row.try_get("captured_at")?,
        })
    }
}

/// Flattened capture ready for insertion.
#[derive(Debug, Clone)]
pub struct NewInspectionLocation {
    pub kind: LocationKind,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy_m: Option<f64>,
    pub note: Option<String>,
    pub gps_failure: Option<GpsFailure>,
    pub captured_by: DbId,
}

impl NewInspectionLocation {
    pub fn from_capture(capture: &LocationCapture, captured_by: DbId) -> Self {
        match capture {
            LocationCapture::Gps {
                latitude,
                longitude,
                accuracy_m,
            } => Self {
                kind: LocationKind::Gps,
                latitude: Some(*latitude),
                longitude: Some(*longitude),
                accuracy_m: *accuracy_m,
                note: None,
                gps_failure: None,
                captured_by,
            },
            LocationCapture::Manual { note, gps_failure } => Self {
                kind: LocationKind::Manual,
                latitude: None,
                longitude: None,
                accuracy_m: None,
                note: Some(note.clone()),
                gps_failure: *gps_failure,
                captured_by,
            },
        }
    }
}
