//! Repository for the `reports` table.

use slf_core::types::DbId;
use sqlx::PgPool;

use super::TransitionRepo;
use crate::models::report::{CreateReport, Report, ReportTransition};

const COLUMNS: &str = "id, project_id, schedule_id, author_id, status, findings, file_ref, \
    reviewed_by, reviewed_at, review_notes, version, created_at, updated_at";

/// Provides CRUD and transition operations for reports.
pub struct ReportRepo;

impl ReportRepo {
    pub async fn create(pool: &PgPool, input: &CreateReport) -> Result<Report, sqlx::Error> {
        let query = format!(
            "INSERT INTO reports (project_id, schedule_id, author_id, file_ref) \
             VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Report>(&query)
            .bind(input.project_id)
            .bind(input.schedule_id)
            .bind(input.author_id)
            .bind(&input.file_ref)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Report>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reports WHERE id = $1");
        sqlx::query_as::<_, Report>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Report>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reports WHERE project_id = $1 ORDER BY id");
        sqlx::query_as::<_, Report>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    pub async fn current_version(pool: &PgPool, id: DbId) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar("SELECT version FROM reports WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Apply a status change with its audit row.
    pub async fn apply_transition(
        pool: &PgPool,
        id: DbId,
        expected_version: i32,
        change: &ReportTransition,
    ) -> Result<Option<Report>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let Some(report) = Self::transition_in_tx(&mut tx, id, expected_version, change).await?
        else {
            return Ok(None);
        };
        tx.commit().await?;
        Ok(Some(report))
    }

    /// Compare-and-swap the status and insert the audit row inside `tx`.
    ///
    /// When `change.review` is set, all three review fields are written in
    /// the same statement.
    pub(crate) async fn transition_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        expected_version: i32,
        change: &ReportTransition,
    ) -> Result<Option<Report>, sqlx::Error> {
        let stamp = change.review.is_some();
        let query = format!(
            "UPDATE reports SET \
                status = $3, \
                reviewed_by = CASE WHEN $4 THEN $5 ELSE reviewed_by END, \
                reviewed_at = CASE WHEN $4 THEN NOW() ELSE reviewed_at END, \
                review_notes = CASE WHEN $4 THEN $6 ELSE review_notes END, \
                version = version + 1, \
                updated_at = NOW() \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Report>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(change.to.as_str())
            .bind(stamp)
            .bind(change.review.as_ref().map(|r| r.reviewed_by))
            .bind(change.review.as_ref().and_then(|r| r.review_notes.clone()))
            .fetch_optional(&mut **tx)
            .await?;

        if updated.is_some() {
            TransitionRepo::insert(tx, &change.audit).await?;
        }
        Ok(updated)
    }

    pub async fn set_findings(
        pool: &PgPool,
        id: DbId,
        expected_version: i32,
        findings: &[DbId],
    ) -> Result<Option<Report>, sqlx::Error> {
        let query = format!(
            "UPDATE reports SET findings = $3, version = version + 1, updated_at = NOW() \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Report>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(findings)
            .fetch_optional(pool)
            .await
    }
}
