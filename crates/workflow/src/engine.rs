//! The workflow state machine for projects and reports.
//!
//! Every status change goes through [`WorkflowEngine`]. A request is checked
//! in a fixed order (the caller's expected version, then edge, role and
//! payload against the transition graph) and only then written, together
//! with its audit row, as one compare-and-swap on the entity's version. A
//! failed request leaves the entity untouched. Entering a chain-gated state
//! opens the approval chain in that same write.

use slf_core::access::project_scope;
use slf_core::error::CoreError;
use slf_core::roles::Role;
use slf_core::status::{EntityKind, ProjectStatus, ReportStatus};
use slf_core::types::{Actor, DbId};
use slf_core::workflow::{self, EdgeKind};
use slf_db::models::project::{CreateProject, Project, ProjectFilter, ProjectTransition};
use slf_db::models::report::{Report, ReportTransition};
use slf_db::models::transition::{NewTransition, StatusTransition};
use slf_events::{kinds, Recipient, WorkflowEvent};

use crate::approval::ApprovalCoordinator;
use crate::context::{check_version, clean_notes, Context};

const PROJECT_CREATORS: &[Role] = &[Role::Client, Role::AdminTeam, Role::AdminLead];

/// A user's request to move an entity to `target`.
#[derive(Debug, Clone)]
pub struct TransitionRequest<S> {
    pub target: S,
    pub actor: Actor,
    pub notes: Option<String>,
    /// Version the caller last saw. `None` skips the caller-side check; the
    /// write itself is still conditioned on the version just read.
    pub expected_version: Option<i32>,
}

impl<S> TransitionRequest<S> {
    pub fn new(target: S, actor: Actor) -> Self {
        Self {
            target,
            actor,
            notes: None,
            expected_version: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn at_version(mut self, version: i32) -> Self {
        self.expected_version = Some(version);
        self
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

#[derive(Clone)]
pub struct WorkflowEngine {
    ctx: Context,
    approvals: ApprovalCoordinator,
}

impl WorkflowEngine {
    pub(crate) fn new(ctx: Context, approvals: ApprovalCoordinator) -> Self {
        Self { ctx, approvals }
    }

    // ── Projects ──

    /// Create a project in `draft`. Clients may only create their own.
    pub async fn create_project(
        &self,
        input: CreateProject,
        actor: Actor,
    ) -> Result<Project, CoreError> {
        if !PROJECT_CREATORS.contains(&actor.role) {
            return Err(CoreError::Unauthorized {
                role: actor.role.to_string(),
                action: "create projects".to_string(),
            });
        }
        if actor.role == Role::Client && input.client_id != actor.user_id {
            return Err(CoreError::Forbidden(
                "Clients may only create projects for themselves".to_string(),
            ));
        }
        if input.name.trim().is_empty() {
            return Err(CoreError::Validation("Project name is required".to_string()));
        }
        if input.address.trim().is_empty() {
            return Err(CoreError::Validation("Project address is required".to_string()));
        }

        let store = self.ctx.store();
        let input = &input;
        let project = self.ctx.retry(move || store.create_project(input)).await?;

        tracing::info!(
            project_id = project.id,
            client_id = project.client_id,
            application_type = %project.application_type,
            actor_id = actor.user_id,
            "Project created"
        );
        Ok(project)
    }

    pub async fn get_project(&self, id: DbId, actor: &Actor) -> Result<Project, CoreError> {
        self.ctx.visible_project(id, actor).await
    }

    pub async fn list_projects(
        &self,
        filter: &ProjectFilter,
        actor: &Actor,
    ) -> Result<Vec<Project>, CoreError> {
        let store = self.ctx.store();
        let scope = project_scope(actor);
        self.ctx
            .retry(move || store.list_projects(filter, scope))
            .await
    }

    /// Audit trail of a project, oldest first.
    pub async fn project_history(
        &self,
        id: DbId,
        actor: &Actor,
    ) -> Result<Vec<StatusTransition>, CoreError> {
        self.ctx.visible_project(id, actor).await?;
        let store = self.ctx.store();
        self.ctx
            .retry(move || store.list_transitions(EntityKind::Project, id))
            .await
    }

    pub async fn request_project_transition(
        &self,
        id: DbId,
        request: TransitionRequest<ProjectStatus>,
    ) -> Result<Project, CoreError> {
        let actor = request.actor;
        let project = self.ctx.visible_project(id, &actor).await?;
        let expected = check_version("project", id, project.version, request.expected_version)?;
        let edge = workflow::project::check(
            project.status,
            project.rejected_from,
            request.target,
            actor.role,
            request.notes(),
        )?;

        let notes = clean_notes(request.notes());
        let (rejected_from, rejection_notes) = match edge.kind {
            EdgeKind::Reject => (Some(project.status), notes.clone()),
            EdgeKind::Resubmit => (None, project.rejection_notes.clone()),
            _ => (project.rejected_from, project.rejection_notes.clone()),
        };
        let change = ProjectTransition {
            to: edge.to,
            rejected_from,
            rejection_notes,
            audit: NewTransition::new(
                EntityKind::Project,
                id,
                project.status,
                edge.to,
                actor,
                notes.clone(),
            ),
        };

        let updated = if workflow::project::opens_chain(edge.to) {
            self.approvals
                .open_project_review(&project, change, expected, actor)
                .await?
                .project
        } else {
            let store = self.ctx.store();
            let change = &change;
            self.ctx
                .retry(move || store.apply_project_transition(id, expected, change))
                .await?
        };

        tracing::info!(
            project_id = id,
            from = %project.status,
            to = %updated.status,
            actor_id = actor.user_id,
            actor_role = %actor.role,
            version = updated.version,
            "Project transitioned"
        );

        notify_project_change(&self.ctx, &updated, project.status, actor, notes).await;
        Ok(updated)
    }

    // ── Reports ──

    /// Direct report transitions. Entering `under_review` opens the
    /// approval chain; leaving it happens only through chain decisions.
    pub async fn request_report_transition(
        &self,
        id: DbId,
        request: TransitionRequest<ReportStatus>,
    ) -> Result<Report, CoreError> {
        if request.target == ReportStatus::UnderReview {
            let review = self
                .approvals
                .submit_for_review(id, None, request.actor, request.expected_version)
                .await?;
            return Ok(review.report);
        }

        let actor = request.actor;
        let store = self.ctx.store();
        let report = self.ctx.retry(move || store.get_report(id)).await?;
        let project = self.ctx.visible_project(report.project_id, &actor).await?;

        let expected = check_version("report", id, report.version, request.expected_version)?;
        let edge =
            workflow::report::check(report.status, request.target, actor.role, request.notes())?;

        let notes = clean_notes(request.notes());
        let change = ReportTransition {
            to: edge.to,
            review: None,
            audit: NewTransition::new(EntityKind::Report, id, report.status, edge.to, actor, notes),
        };
        let change = &change;
        let updated = self
            .ctx
            .retry(move || store.apply_report_transition(id, expected, change))
            .await?;

        tracing::info!(
            report_id = id,
            project_id = report.project_id,
            from = %report.status,
            to = %updated.status,
            actor_id = actor.user_id,
            "Report transitioned"
        );

        let event = WorkflowEvent::new(
            kinds::REPORT_TRANSITIONED,
            EntityKind::Report,
            id,
            format!(
                "Report {id} for '{}' moved from {} to {}",
                project.name, report.status, updated.status
            ),
        )
        .by(actor)
        .to(Recipient::User(report.author_id))
        .to_user(project.project_lead_id);
        self.ctx.notify(event).await;

        Ok(updated)
    }
}

/// Tell the client, the lead and whoever acts next that a project moved.
pub(crate) async fn notify_project_change(
    ctx: &Context,
    project: &Project,
    from: ProjectStatus,
    actor: Actor,
    notes: Option<String>,
) {
    let (event_kind, message) = if project.status == ProjectStatus::Rejected {
        (
            kinds::PROJECT_REJECTED,
            format!(
                "Project '{}' was rejected at {from}: {}",
                project.name,
                notes.as_deref().unwrap_or_default()
            ),
        )
    } else {
        (
            kinds::PROJECT_TRANSITIONED,
            format!(
                "Project '{}' moved from {from} to {}",
                project.name, project.status
            ),
        )
    };

    let mut event = WorkflowEvent::new(event_kind, EntityKind::Project, project.id, message)
        .by(actor)
        .to(Recipient::User(project.client_id))
        .to_user(project.project_lead_id)
        .with_payload(serde_json::json!({
            "from": from,
            "to": project.status,
            "version": project.version,
        }));
    for recipient in next_actors(ctx, project).await {
        event = event.to(recipient);
    }
    ctx.notify(event).await;
}

/// Users who can move the project on from its new status. Chain-decided
/// edges are left to the chain's own step notifications.
async fn next_actors(ctx: &Context, project: &Project) -> Vec<Recipient> {
    let mut roles: Vec<Role> = workflow::project::edges_from(project.status, project.rejected_from)
        .into_iter()
        .filter(|e| !matches!(e.kind, EdgeKind::Cancel | EdgeKind::ChainDecision))
        .flat_map(|e| e.roles.iter().copied())
        .collect();
    roles.sort_by_key(|r| r.as_str());
    roles.dedup();

    let mut recipients = Vec::new();
    let mut needs_team = false;
    for role in roles {
        match role {
            Role::Client => recipients.push(Recipient::User(project.client_id)),
            Role::ProjectLead => {
                if let Some(lead) = project.project_lead_id {
                    recipients.push(Recipient::User(lead));
                }
            }
            Role::Inspector | Role::Drafter => needs_team = true,
            global => recipients.push(Recipient::Role(global)),
        }
    }

    if needs_team {
        let store = ctx.store();
        let project_id = project.id;
        match ctx.retry(move || store.list_team_members(project_id)).await {
            Ok(members) => recipients.extend(
                members
                    .into_iter()
                    .filter(|u| matches!(u.role, Role::Inspector | Role::Drafter))
                    .map(|u| Recipient::User(u.id)),
            ),
            Err(e) => {
                tracing::warn!(error = %e, project_id, "Failed to load team for notification");
            }
        }
    }
    recipients
}
