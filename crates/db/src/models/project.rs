//! Project entity model and DTOs.

use serde::{Deserialize, Serialize};
use slf_core::status::{ApplicationType, ProjectStatus};
use slf_core::types::{DbId, Timestamp};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use super::transition::NewTransition;
use super::{label, optional_label};

/// A row from the `projects` table.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: DbId,
    pub name: String,
    pub address: String,
    pub city: String,
    pub application_type: ApplicationType,
    pub client_id: DbId,
    pub project_lead_id: Option<DbId>,
    pub admin_lead_id: Option<DbId>,
    pub status: ProjectStatus,
    /// Review state the project was last rejected from.
    pub rejected_from: Option<ProjectStatus>,
    pub rejection_notes: Option<String>,
    pub version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl<'r> FromRow<'r, PgRow> for Project {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            address: row.try_get("address")?,
            city: row.try_get("city")?,
            application_type: label(row, "application_type")?,
            client_id: row.try_get("client_id")?,
            project_lead_id: row.try_get("project_lead_id")?,
            admin_lead_id: row.try_get("admin_lead_id")?,
            status: label(row, "status")?,
            rejected_from: optional_label(row, "rejected_from")?,
            rejection_notes: row.try_get("rejection_notes")?,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// DTO for creating a project. New projects always start in `draft`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub address: String,
    pub city: String,
    pub application_type: ApplicationType,
    pub client_id: DbId,
    pub project_lead_id: Option<DbId>,
    pub admin_lead_id: Option<DbId>,
}

/// Optional listing filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub application_type: Option<ApplicationType>,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project) -> bool {
        self.status.map_or(true, |s| s == project.status)
            && self
                .application_type
                .map_or(true, |t| t == project.application_type)
    }
}

/// One validated status change plus its audit row.
#[derive(Debug, Clone)]
pub struct ProjectTransition {
    pub to: ProjectStatus,
    pub rejected_from: Option<ProjectStatus>,
    pub rejection_notes: Option<String>,
    pub audit: NewTransition,
}
