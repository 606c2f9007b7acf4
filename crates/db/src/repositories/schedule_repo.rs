//! Repository for the `schedules` and `inspection_locations` tables.

use slf_core::status::ScheduleStatus;
use slf_core::types::DbId;
use sqlx::PgPool;

use super::TransitionRepo;
use crate::models::schedule::{
    CreateSchedule, InspectionLocation, NewInspectionLocation, Schedule, ScheduleTransition,
};
use crate::models::transition::NewTransition;

const COLUMNS: &str = "id, project_id, schedule_type, scheduled_date, assigned_to, status, \
    started_at, ended_at, notes, created_by, version, created_at, updated_at";

const LOCATION_COLUMNS: &str = "id, schedule_id, kind, latitude, longitude, accuracy_m, \
    note, gps_failure, captured_by, captured_at";

/// Provides CRUD and lifecycle operations for schedules.
pub struct ScheduleRepo;

impl ScheduleRepo {
    pub async fn create(pool: &PgPool, input: &CreateSchedule) -> Result<Schedule, sqlx::Error> {
        let query = format!(
            "INSERT INTO schedules (project_id, schedule_type, scheduled_date, notes, created_by) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Schedule>(&query)
            .bind(input.project_id)
            .bind(input.schedule_type.as_str())
            .bind(input.scheduled_date)
            .bind(&input.notes)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Schedule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM schedules WHERE id = $1");
        sqlx::query_as::<_, Schedule>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Ordered by scheduled date.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Schedule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM schedules WHERE project_id = $1 ORDER BY scheduled_date, id"
        );
        sqlx::query_as::<_, Schedule>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Schedules currently `in_progress` for an assignee.
    pub async fn list_active_for(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Schedule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM schedules WHERE assigned_to = $1 AND status = $2 ORDER BY id"
        );
        sqlx::query_as::<_, Schedule>(&query)
            .bind(user_id)
            .bind(ScheduleStatus::InProgress.as_str())
            .fetch_all(pool)
            .await
    }

    pub async fn current_version(pool: &PgPool, id: DbId) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar("SELECT version FROM schedules WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_assignee(
        pool: &PgPool,
        id: DbId,
        expected_version: i32,
        user_id: DbId,
    ) -> Result<Option<Schedule>, sqlx::Error> {
        let query = format!(
            "UPDATE schedules SET assigned_to = $3, version = version + 1, updated_at = NOW() \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Schedule>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Move to `in_progress` and record the location in one transaction.
    ///
    /// The partial unique index on `(assigned_to) WHERE status = 'in_progress'`
    /// rejects a second active inspection for the same assignee.
    pub async fn start_inspection(
        pool: &PgPool,
        id: DbId,
        expected_version: i32,
        location: &NewInspectionLocation,
        audit: &NewTransition,
    ) -> Result<Option<Schedule>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE schedules SET \
                status = $3, started_at = NOW(), version = version + 1, updated_at = NOW() \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Schedule>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(ScheduleStatus::InProgress.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(schedule) = updated else {
            return Ok(None);
        };

        sqlx::query(
            "INSERT INTO inspection_locations \
                (schedule_id, kind, latitude, longitude, accuracy_m, note, gps_failure, captured_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id)
        .bind(location.kind.as_str())
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(location.accuracy_m)
        .bind(&location.note)
        .bind(location.gps_failure.map(|f| f.as_str()))
        .bind(location.captured_by)
        .execute(&mut *tx)
        .await?;

        TransitionRepo::insert(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(Some(schedule))
    }

    /// Apply a status change; closing states stamp `ended_at`.
    pub async fn apply_transition(
        pool: &PgPool,
        id: DbId,
        expected_version: i32,
        change: &ScheduleTransition,
    ) -> Result<Option<Schedule>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE schedules SET \
                status = $3, \
                ended_at = CASE WHEN $3 IN ('completed', 'cancelled') THEN NOW() ELSE ended_at END, \
                version = version + 1, \
                updated_at = NOW() \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Schedule>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(change.to.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(schedule) = updated else {
            return Ok(None);
        };

        TransitionRepo::insert(&mut tx, &change.audit).await?;
        tx.commit().await?;
        Ok(Some(schedule))
    }

    pub async fn find_location(
        pool: &PgPool,
        schedule_id: DbId,
    ) -> Result<Option<InspectionLocation>, sqlx::Error> {
        let query =
            format!("SELECT {LOCATION_COLUMNS} FROM inspection_locations WHERE schedule_id = $1");
        sqlx::query_as::<_, InspectionLocation>(&query)
            .bind(schedule_id)
            .fetch_optional(pool)
            .await
    }
}
