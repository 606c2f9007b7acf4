//! Repository for the `documents` table.

use slf_core::status::DocumentStatus;
use slf_core::types::DbId;
use sqlx::PgPool;

use crate::models::document::{CreateDocument, Document, DocumentChange};

const COLUMNS: &str = "id, project_id, category, uploaded_by, status, file_ref, file_name, \
    file_format, file_size_bytes, revision, revision_notes, verified_by, verified_at, \
    version, created_at, updated_at";

/// Provides CRUD operations for documents.
pub struct DocumentRepo;

impl DocumentRepo {
    /// Insert a document together with its first file.
    pub async fn create(pool: &PgPool, input: &CreateDocument) -> Result<Document, sqlx::Error> {
        let query = format!(
            "INSERT INTO documents \
                (project_id, category, uploaded_by, status, \
                 file_ref, file_name, file_format, file_size_bytes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(input.project_id)
            .bind(&input.category)
            .bind(input.uploaded_by)
            .bind(DocumentStatus::Uploaded.as_str())
            .bind(&input.file.file_ref)
            .bind(&input.file.file_name)
            .bind(&input.file.file_format)
            .bind(input.file.file_size_bytes)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Document>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM documents WHERE id = $1");
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The document of a project for one category, if registered.
    pub async fn find_by_category(
        pool: &PgPool,
        project_id: DbId,
        category: &str,
    ) -> Result<Option<Document>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM documents WHERE project_id = $1 AND category = $2");
        sqlx::query_as::<_, Document>(&query)
            .bind(project_id)
            .bind(category)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Document>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM documents WHERE project_id = $1 ORDER BY id");
        sqlx::query_as::<_, Document>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    pub async fn current_version(pool: &PgPool, id: DbId) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar("SELECT version FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Overwrite the mutable fields if the row is still at `expected_version`.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        expected_version: i32,
        change: &DocumentChange,
    ) -> Result<Option<Document>, sqlx::Error> {
        let query = format!(
            "UPDATE documents SET \
                status = $3, uploaded_by = $4, file_ref = $5, file_name = $6, \
                file_format = $7, file_size_bytes = $8, revision = $9, \
                revision_notes = $10, verified_by = $11, verified_at = $12, \
                version = version + 1, updated_at = NOW() \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(change.status.as_str())
            .bind(change.uploaded_by)
            .bind(&change.file_ref)
            .bind(&change.file_name)
            .bind(&change.file_format)
            .bind(change.file_size_bytes)
            .bind(change.revision)
            .bind(&change.revision_notes)
            .bind(change.verified_by)
            .bind(change.verified_at)
            .fetch_optional(pool)
            .await
    }
}
