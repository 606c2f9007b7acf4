//! State shared by every workflow service.

use std::future::Future;
use std::sync::Arc;

use slf_core::access::{can_view, project_scope, ProjectScope};
use slf_core::error::CoreError;
use slf_core::roles::Role;
use slf_core::types::{Actor, DbId};
use slf_db::models::project::Project;
use slf_db::store::EntityStore;
use slf_events::{NotificationDispatcher, WorkflowEvent};

use crate::retry::with_retry;
use crate::settings::WorkflowSettings;

#[derive(Clone)]
pub(crate) struct Context {
    store: Arc<dyn EntityStore>,
    dispatcher: NotificationDispatcher,
    pub settings: Arc<WorkflowSettings>,
}

impl Context {
    pub fn new(
        store: Arc<dyn EntityStore>,
        dispatcher: NotificationDispatcher,
        settings: Arc<WorkflowSettings>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            settings,
        }
    }

    pub fn store(&self) -> &dyn EntityStore {
        self.store.as_ref()
    }

    pub fn store_handle(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// Run a storage call under the configured retry policy.
    pub async fn retry<T, F, Fut>(&self, op: F) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        with_retry(&self.settings.retry, op).await
    }

    /// Best-effort; never fails the caller.
    pub async fn notify(&self, event: WorkflowEvent) {
        self.dispatcher.notify(event).await;
    }

    /// Load a project the actor may see.
    ///
    /// Projects outside the actor's scope are reported as missing.
    pub async fn visible_project(&self, id: DbId, actor: &Actor) -> Result<Project, CoreError> {
        let store = self.store();
        let project = self.retry(move || store.get_project(id)).await?;

        let scope = project_scope(actor);
        let is_member = match scope {
            ProjectScope::All | ProjectScope::ClientOwned(_) => false,
            ProjectScope::Led(lead) if project.project_lead_id == Some(lead) => true,
            ProjectScope::Led(user_id) | ProjectScope::TeamMember(user_id) => {
                self.retry(move || store.is_team_member(id, user_id)).await?
            }
        };

        if can_view(scope, project.client_id, project.project_lead_id, is_member) {
            Ok(project)
        } else {
            Err(CoreError::NotFound {
                entity: "project",
                id,
            })
        }
    }
}

/// Compare the caller's expected version with the stored one.
///
/// Returns the version the write must be conditioned on.
pub(crate) fn check_version(
    entity: &'static str,
    id: DbId,
    current: i32,
    expected: Option<i32>,
) -> Result<i32, CoreError> {
    match expected {
        Some(expected) if expected != current => Err(CoreError::StaleState {
            entity,
            id,
            expected,
        }),
        _ => Ok(current),
    }
}

pub(crate) fn require_role(actor: &Actor, allowed: &[Role], action: &str) -> Result<(), CoreError> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(CoreError::Unauthorized {
            role: actor.role.to_string(),
            action: action.to_string(),
        })
    }
}

/// Trimmed notes, or `None` when blank.
pub(crate) fn clean_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}
