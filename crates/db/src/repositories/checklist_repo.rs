//! Repository for the `checklist_items` and `checklist_responses` tables.

use slf_core::types::DbId;
use sqlx::PgPool;

use crate::models::checklist::{
    ChecklistItem, ChecklistResponse, CreateChecklistItem, UpsertChecklistResponse,
};

const ITEM_COLUMNS: &str =
    "id, code, category, label, response_kind, options, min_value, max_value, is_required, created_at";

const RESPONSE_COLUMNS: &str =
    "id, schedule_id, item_id, responder_id, payload, status, created_at, updated_at";

/// Checklist catalogue and inspection answers.
pub struct ChecklistRepo;

impl ChecklistRepo {
    pub async fn create_item(
        pool: &PgPool,
        input: &CreateChecklistItem,
    ) -> Result<ChecklistItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO checklist_items \
                (code, category, label, response_kind, options, min_value, max_value, is_required) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ITEM_COLUMNS}"
        );
        sqlx::query_as::<_, ChecklistItem>(&query)
            .bind(&input.code)
            .bind(&input.category)
            .bind(&input.label)
            .bind(input.response_kind.as_str())
            .bind(&input.options)
            .bind(input.min_value)
            .bind(input.max_value)
            .bind(input.is_required)
            .fetch_one(pool)
            .await
    }

    pub async fn find_item(pool: &PgPool, id: DbId) -> Result<Option<ChecklistItem>, sqlx::Error> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM checklist_items WHERE id = $1");
        sqlx::query_as::<_, ChecklistItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_items(pool: &PgPool) -> Result<Vec<ChecklistItem>, sqlx::Error> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM checklist_items ORDER BY category, id");
        sqlx::query_as::<_, ChecklistItem>(&query)
            .fetch_all(pool)
            .await
    }

    /// Insert or replace the answer keyed by `(schedule_id, item_id, responder_id)`.
    ///
    /// The latest payload wins; `created_at` keeps the first save.
    pub async fn upsert_response(
        pool: &PgPool,
        input: &UpsertChecklistResponse,
    ) -> Result<ChecklistResponse, sqlx::Error> {
        let query = format!(
            "INSERT INTO checklist_responses (schedule_id, item_id, responder_id, payload, status) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (schedule_id, item_id, responder_id) DO UPDATE SET \
                payload = EXCLUDED.payload, \
                status = EXCLUDED.status, \
                updated_at = NOW() \
             RETURNING {RESPONSE_COLUMNS}"
        );
        sqlx::query_as::<_, ChecklistResponse>(&query)
            .bind(input.schedule_id)
            .bind(input.item_id)
            .bind(input.responder_id)
            .bind(&input.payload)
            .bind(input.status.as_str())
            .fetch_one(pool)
            .await
    }

    pub async fn list_responses(
        pool: &PgPool,
        schedule_id: DbId,
    ) -> Result<Vec<ChecklistResponse>, sqlx::Error> {
        let query = format!(
            "SELECT {RESPONSE_COLUMNS} FROM checklist_responses WHERE schedule_id = $1 ORDER BY item_id, id"
        );
        sqlx::query_as::<_, ChecklistResponse>(&query)
            .bind(schedule_id)
            .fetch_all(pool)
            .await
    }
}
