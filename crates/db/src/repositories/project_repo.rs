//! Repository for the `projects` table.

use slf_core::access::ProjectScope;
use slf_core::status::EntityKind;
use slf_core::types::DbId;
use sqlx::PgPool;

use super::{ApprovalRepo, TransitionRepo};
use crate::models::project::{CreateProject, Project, ProjectFilter, ProjectTransition};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, address, city, application_type, client_id, \
    project_lead_id, admin_lead_id, status, rejected_from, rejection_notes, \
    version, created_at, updated_at";

/// Provides CRUD and transition operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project in `draft`.
    pub async fn create(pool: &PgPool, input: &CreateProject) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects \
                (name, address, city, application_type, client_id, project_lead_id, admin_lead_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.name)
            .bind(&input.address)
            .bind(&input.city)
            .bind(input.application_type.as_str())
            .bind(input.client_id)
            .bind(input.project_lead_id)
            .bind(input.admin_lead_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List projects visible within `scope`, newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &ProjectFilter,
        scope: ProjectScope,
    ) -> Result<Vec<Project>, sqlx::Error> {
        const MEMBER: &str = "EXISTS (SELECT 1 FROM project_team_members m \
             WHERE m.project_id = p.id AND m.user_id = $3)";

        let (scope_clause, scope_user) = match scope {
            ProjectScope::All => ("TRUE".to_string(), None),
            ProjectScope::ClientOwned(id) => ("p.client_id = $3".to_string(), Some(id)),
            ProjectScope::Led(id) => (format!("(p.project_lead_id = $3 OR {MEMBER})"), Some(id)),
            ProjectScope::TeamMember(id) => (MEMBER.to_string(), Some(id)),
        };

        let query = format!(
            "SELECT {COLUMNS} FROM projects p \
             WHERE ($1::TEXT IS NULL OR p.status = $1) \
               AND ($2::TEXT IS NULL OR p.application_type = $2) \
               AND {scope_clause} \
             ORDER BY p.created_at DESC, p.id DESC"
        );
        let mut q = sqlx::query_as::<_, Project>(&query)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.application_type.map(|t| t.as_str()));
        if let Some(user_id) = scope_user {
            q = q.bind(user_id);
        }
        q.fetch_all(pool).await
    }

    pub async fn current_version(pool: &PgPool, id: DbId) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar("SELECT version FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Apply a status change with its audit row.
    ///
    /// A chain still in flight for the project is abandoned in the same
    /// transaction.
    pub async fn apply_transition(
        pool: &PgPool,
        id: DbId,
        expected_version: i32,
        change: &ProjectTransition,
    ) -> Result<Option<Project>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let Some(project) = Self::transition_in_tx(&mut tx, id, expected_version, change).await?
        else {
            return Ok(None);
        };
        ApprovalRepo::abandon_in_tx(&mut tx, EntityKind::Project, id).await?;
        tx.commit().await?;
        Ok(Some(project))
    }

    /// Compare-and-swap the status and insert the audit row inside `tx`.
    pub(crate) async fn transition_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        expected_version: i32,
        change: &ProjectTransition,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET \
                status = $3, \
                rejected_from = $4, \
                rejection_notes = $5, \
                version = version + 1, \
                updated_at = NOW() \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(change.to.as_str())
            .bind(change.rejected_from.map(|s| s.as_str()))
            .bind(&change.rejection_notes)
            .fetch_optional(&mut **tx)
            .await?;

        if updated.is_some() {
            TransitionRepo::insert(tx, &change.audit).await?;
        }
        Ok(updated)
    }
}
