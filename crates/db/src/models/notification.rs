//! Notification entity model and DTOs.

use serde::Serialize;
use slf_core::status::EntityKind;
use slf_core::types::{DbId, Timestamp};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use super::optional_label;

/// A row from the `notifications` table.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub recipient_id: DbId,
    pub sender_id: Option<DbId>,
    pub kind: String,
    pub message: String,
    pub entity_type: Option<EntityKind>,
    pub entity_id: Option<DbId>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl<'r> FromRow<'r, PgRow> for Notification {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            recipient_id: row.try_get("recipient_id")?,
            sender_id: row.try_get("sender_id")?,
            kind: row.try_get("kind")?,
            message: row.try_get("message")?,
            entity_type: optional_label(row, "entity_type")?,
            entity_id: row.try_get("entity_id")?,
            is_read: row.try_get("is_read")?,
            read_at: row.try_get("read_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: DbId,
    pub sender_id: Option<DbId>,
    pub kind: String,
    pub message: String,
    pub entity_type: Option<EntityKind>,
    pub entity_id: Option<DbId>,
}
