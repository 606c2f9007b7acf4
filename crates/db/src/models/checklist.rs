//! Checklist item and response models.

use serde::{Deserialize, Serialize};
use slf_core::checklist::{ItemSchema, ResponseKind};
use slf_core::status::ResponseStatus;
use slf_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `checklist_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChecklistItem {
    pub id: DbId,
    pub code: String,
    pub category: String,
    pub label: String,
    #[sqlx(try_from = "String")]
    pub response_kind: ResponseKind,
    pub options: Vec<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub is_required: bool,
    pub created_at: Timestamp,
}

impl ChecklistItem {
    pub fn schema(&self) -> ItemSchema<'_> {
        ItemSchema {
            kind: self.response_kind,
            options: &self.options,
            min_value: self.min_value,
            max_value: self.max_value,
        }
    }
}

/// DTO for creating a checklist item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateChecklistItem {
    pub code: String,
    pub category: String,
    pub label: String,
    pub response_kind: ResponseKind,
    #[serde(default)]
    pub options: Vec<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    #[serde(default)]
    pub is_required: bool,
}

impl CreateChecklistItem {
    pub fn schema(&self) -> ItemSchema<'_> {
        ItemSchema {
            kind: self.response_kind,
            options: &self.options,
            min_value: self.min_value,
            max_value: self.max_value,
        }
    }
}

/// A row from the `checklist_responses` table.
///
/// Unique on `(schedule_id, item_id, responder_id)`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChecklistResponse {
    pub id: DbId,
    pub schedule_id: DbId,
    pub item_id: DbId,
    pub responder_id: DbId,
    pub payload: serde_json::Value,
    #[sqlx(try_from = "String")]
    pub status: ResponseStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert-or-replace input keyed by schedule, item and responder.
#[derive(Debug, Clone)]
pub struct UpsertChecklistResponse {
    pub schedule_id: DbId,
    pub item_id: DbId,
    pub responder_id: DbId,
    pub payload: serde_json::Value,
    pub status: ResponseStatus,
}
