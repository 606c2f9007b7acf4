use crate::types::DbId;

/// Domain error shared by every layer of the workflow service.
///
/// Every variant except [`CoreError::StorageUnavailable`] is a business
/// outcome and must be reported to the caller as-is.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Illegal transition: {entity} cannot move from '{from}' to '{to}'")]
    IllegalTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Role '{role}' is not allowed to {action}")]
    Unauthorized { role: String, action: String },

    #[error("Missing payload: {0}")]
    MissingPayload(String),

    #[error("Stale state: {entity} {id} changed since version {expected}")]
    StaleState {
        entity: &'static str,
        id: DbId,
        expected: i32,
    },

    #[error("Role mismatch: user {user_id} has role '{actual}' but '{required}' is required")]
    RoleMismatch {
        user_id: DbId,
        required: String,
        actual: String,
    },

    #[error("User {user_id} is not a member of project {project_id}")]
    NotTeamMember { user_id: DbId, project_id: DbId },

    #[error("An approval chain is already in progress for {entity} {id}")]
    ChainInProgress { entity: &'static str, id: DbId },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether a failed call may be retried automatically.
    ///
    /// Only backend connectivity failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::StorageUnavailable(_))
    }
}
