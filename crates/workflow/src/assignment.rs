//! Assigning schedules and managing project teams.

use slf_core::assignment;
use slf_core::error::CoreError;
use slf_core::status::EntityKind;
use slf_core::types::{Actor, DbId};
use slf_db::models::schedule::Schedule;
use slf_db::models::user::User;
use slf_events::{kinds, Recipient, WorkflowEvent};

use crate::context::{check_version, require_role, Context};

#[derive(Clone)]
pub struct AssignmentManager {
    ctx: Context,
}

impl AssignmentManager {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Assign a schedule to a user on the project team.
    ///
    /// Checks run in order: assigner role, schedule still `scheduled`,
    /// assignee role fits the schedule type, assignee on the team.
    /// Assigning the current assignee again changes nothing.
    pub async fn assign(
        &self,
        schedule_id: DbId,
        user_id: DbId,
        actor: Actor,
        expected_version: Option<i32>,
    ) -> Result<Schedule, CoreError> {
        assignment::check_assigner(actor.role)?;

        let store = self.ctx.store();
        let schedule = self.ctx.retry(move || store.get_schedule(schedule_id)).await?;
        let project = self.ctx.visible_project(schedule.project_id, &actor).await?;
        let expected = check_version("schedule", schedule_id, schedule.version, expected_version)?;
        assignment::check_reassignable(schedule.status)?;

        let user = self.ctx.retry(move || store.get_user(user_id)).await?;
        assignment::check_assignee_role(schedule.schedule_type, user.id, user.role)?;

        let project_id = project.id;
        let is_member = self
            .ctx
            .retry(move || store.is_team_member(project_id, user_id))
            .await?;
        if !is_member {
            return Err(CoreError::NotTeamMember {
                user_id,
                project_id,
            });
        }

        if schedule.assigned_to == Some(user_id) {
            return Ok(schedule);
        }

        let updated = self
            .ctx
            .retry(move || store.set_schedule_assignee(schedule_id, expected, user_id))
            .await?;

        tracing::info!(
            schedule_id,
            project_id,
            assignee_id = user_id,
            previous_assignee = ?schedule.assigned_to,
            actor_id = actor.user_id,
            "Schedule assigned"
        );

        let event = WorkflowEvent::new(
            kinds::SCHEDULE_ASSIGNED,
            EntityKind::Schedule,
            schedule_id,
            format!(
                "You were assigned the {} for '{}' on {}",
                updated.schedule_type.as_str().replace('_', " "),
                project.name,
                updated.scheduled_date.format("%Y-%m-%d %H:%M UTC")
            ),
        )
        .by(actor)
        .to(Recipient::User(user_id))
        .with_payload(serde_json::json!({
            "project_id": project_id,
            "schedule_type": updated.schedule_type,
        }));
        self.ctx.notify(event).await;

        Ok(updated)
    }

    /// Add a user to a project team. Idempotent.
    pub async fn add_team_member(
        &self,
        project_id: DbId,
        user_id: DbId,
        actor: Actor,
    ) -> Result<Vec<User>, CoreError> {
        require_role(&actor, assignment::ASSIGNER_ROLES, "manage project teams")?;
        self.ctx.visible_project(project_id, &actor).await?;

        let store = self.ctx.store();
        self.ctx.retry(move || store.get_user(user_id)).await?;
        self.ctx
            .retry(move || store.add_team_member(project_id, user_id))
            .await?;

        tracing::info!(project_id, user_id, actor_id = actor.user_id, "Team member added");
        self.ctx
            .retry(move || store.list_team_members(project_id))
            .await
    }

    pub async fn list_team(&self, project_id: DbId, actor: &Actor) -> Result<Vec<User>, CoreError> {
        self.ctx.visible_project(project_id, actor).await?;
        let store = self.ctx.store();
        self.ctx
            .retry(move || store.list_team_members(project_id))
            .await
    }
}
