//! Repository for the `status_transitions` audit table.

use slf_core::status::EntityKind;
use slf_core::types::DbId;
use sqlx::PgPool;

use crate::models::transition::{NewTransition, StatusTransition};

const COLUMNS: &str =
    "id, entity_type, entity_id, from_status, to_status, actor_id, actor_role, notes, created_at";

/// Append-only audit trail of status changes.
pub struct TransitionRepo;

impl TransitionRepo {
    /// Insert an audit row inside the caller's transaction.
    pub async fn insert(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        input: &NewTransition,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO status_transitions \
                (entity_type, entity_id, from_status, to_status, actor_id, actor_role, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(input.entity_type.as_str())
        .bind(input.entity_id)
        .bind(&input.from_status)
        .bind(&input.to_status)
        .bind(input.actor.user_id)
        .bind(input.actor.role.as_str())
        .bind(&input.notes)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Oldest first.
    pub async fn list_for_entity(
        pool: &PgPool,
        entity_type: EntityKind,
        entity_id: DbId,
    ) -> Result<Vec<StatusTransition>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM status_transitions \
             WHERE entity_type = $1 AND entity_id = $2 ORDER BY id"
        );
        sqlx::query_as::<_, StatusTransition>(&query)
            .bind(entity_type.as_str())
            .bind(entity_id)
            .fetch_all(pool)
            .await
    }
}
