//! Report entity model and DTOs.

use serde::{Deserialize, Serialize};
use slf_core::status::ReportStatus;
use slf_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::transition::NewTransition;

/// A row from the `reports` table.
///
/// `reviewed_by`, `reviewed_at` and `review_notes` are written together.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Report {
    pub id: DbId,
    pub project_id: DbId,
    pub schedule_id: Option<DbId>,
    pub author_id: DbId,
    #[sqlx(try_from = "String")]
    pub status: ReportStatus,
    /// Ids of the checklist responses cited as findings.
    pub findings: Vec<DbId>,
    pub file_ref: Option<String>,
    pub reviewed_by: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub review_notes: Option<String>,
    pub version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a report. Starts in `draft` with no findings.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReport {
    pub project_id: DbId,
    pub schedule_id: Option<DbId>,
    pub file_ref: Option<String>,
    #[serde(skip)]
    pub author_id: DbId,
}

/// Review stamp applied when a chain closes.
#[derive(Debug, Clone)]
pub struct ReviewStamp {
    pub reviewed_by: DbId,
    pub review_notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReportTransition {
    pub to: ReportStatus,
    /// `Some` overwrites all review fields at once; `None` keeps them.
    pub review: Option<ReviewStamp>,
    pub audit: NewTransition,
}
