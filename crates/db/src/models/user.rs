//! User entity model and DTOs.
//!
//! Credentials live with the identity provider; this table only mirrors
//! the identity and role the workflow needs.

use serde::{Deserialize, Serialize};
use slf_core::roles::Role;
use slf_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: Timestamp,
}

/// DTO for creating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// A row from the `project_team_members` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TeamMember {
    pub project_id: DbId,
    pub user_id: DbId,
    pub added_at: Timestamp,
}
