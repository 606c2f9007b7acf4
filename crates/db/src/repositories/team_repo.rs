//! Repository for the `project_team_members` table.

use slf_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::User;

/// Project team membership.
pub struct TeamRepo;

impl TeamRepo {
    /// Add a member. Adding an existing member is a no-op.
    pub async fn add(pool: &PgPool, project_id: DbId, user_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO project_team_members (project_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (project_id, user_id) DO NOTHING",
        )
        .bind(project_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn is_member(
        pool: &PgPool,
        project_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM project_team_members WHERE project_id = $1 AND user_id = $2)",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn list_members(pool: &PgPool, project_id: DbId) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT u.id, u.name, u.email, u.role, u.created_at \
             FROM project_team_members m JOIN users u ON u.id = m.user_id \
             WHERE m.project_id = $1 ORDER BY u.id",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }
}
