//! Status transition audit rows.

use serde::Serialize;
use slf_core::roles::Role;
use slf_core::status::EntityKind;
use slf_core::types::{Actor, DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `status_transitions` table. Append-only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusTransition {
    pub id: DbId,
    #[sqlx(try_from = "String")]
    pub entity_type: EntityKind,
    pub entity_id: DbId,
    pub from_status: String,
    pub to_status: String,
    pub actor_id: DbId,
    #[sqlx(try_from = "String")]
    pub actor_role: Role,
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

/// Audit row written in the same transaction as a status change.
#[derive(Debug, Clone)]
pub struct NewTransition {
    pub entity_type: EntityKind,
    pub entity_id: DbId,
    pub from_status: String,
    pub to_status: String,
    pub actor: Actor,
    pub notes: Option<String>,
}

impl NewTransition {
    pub fn new(
        entity_type: EntityKind,
        entity_id: DbId,
        from: impl ToString,
        to: impl ToString,
        actor: Actor,
        notes: Option<String>,
    ) -> Self {
        Self {
            entity_type,
            entity_id,
            from_status: from.to_string(),
            to_status: to.to_string(),
            actor,
            notes,
        }
    }
}
