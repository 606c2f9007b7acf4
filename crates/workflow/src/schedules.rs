//! Schedules and the inspection lifecycle.
//!
//! An inspection starts with a location capture (a GPS fix or a manual
//! note, never both) recorded in the same write as the status change.
//! Each assignee has at most one inspection in progress at a time.

use slf_core::assignment::ASSIGNER_ROLES;
use slf_core::error::CoreError;
use slf_core::geotag::LocationCapture;
use slf_core::status::{EntityKind, ProjectStatus, ScheduleStatus, ScheduleType};
use slf_core::types::{Actor, DbId};
use slf_core::workflow;
use slf_db::models::schedule::{
    CreateSchedule, InspectionLocation, NewInspectionLocation, Schedule, ScheduleTransition,
};
use slf_db::models::transition::NewTransition;
use slf_events::{kinds, Recipient, WorkflowEvent};

use crate::context::{check_version, clean_notes, require_role, Context};
use crate::engine::{TransitionRequest, WorkflowEngine};

#[derive(Clone)]
pub struct ScheduleService {
    ctx: Context,
    engine: WorkflowEngine,
}

impl ScheduleService {
    pub(crate) fn new(ctx: Context, engine: WorkflowEngine) -> Self {
        Self { ctx, engine }
    }

    pub async fn create_schedule(
        &self,
        mut input: CreateSchedule,
        actor: Actor,
    ) -> Result<Schedule, CoreError> {
        require_role(&actor, ASSIGNER_ROLES, "create schedules")?;
        let project = self.ctx.visible_project(input.project_id, &actor).await?;
        if workflow::project::is_terminal(project.status) {
            return Err(CoreError::Validation(format!(
                "Project {} is {} and takes no new schedules",
                project.id, project.status
            )));
        }

        input.created_by = actor.user_id;
        input.notes = clean_notes(input.notes.as_deref());

        let store = self.ctx.store();
        let input = &input;
        let schedule = self.ctx.retry(move || store.create_schedule(input)).await?;

        tracing::info!(
            schedule_id = schedule.id,
            project_id = schedule.project_id,
            schedule_type = %schedule.schedule_type,
            scheduled_date = %schedule.scheduled_date,
            "Schedule created"
        );
        Ok(schedule)
    }

    pub async fn get_schedule(&self, id: DbId, actor: &Actor) -> Result<Schedule, CoreError> {
        let store = self.ctx.store();
        let schedule = self.ctx.retry(move || store.get_schedule(id)).await?;
        self.ctx.visible_project(schedule.project_id, actor).await?;
        Ok(schedule)
    }

    pub async fn list_schedules(
        &self,
        project_id: DbId,
        actor: &Actor,
    ) -> Result<Vec<Schedule>, CoreError> {
        self.ctx.visible_project(project_id, actor).await?;
        let store = self.ctx.store();
        self.ctx.retry(move || store.list_schedules(project_id)).await
    }

    pub async fn get_location(
        &self,
        schedule_id: DbId,
        actor: &Actor,
    ) -> Result<Option<InspectionLocation>, CoreError> {
        self.get_schedule(schedule_id, actor).await?;
        let store = self.ctx.store();
        self.ctx
            .retry(move || store.get_inspection_location(schedule_id))
            .await
    }

    /// Start an inspection at the captured location.
    pub async fn start_inspection(
        &self,
        schedule_id: DbId,
        actor: Actor,
        capture: LocationCapture,
        expected_version: Option<i32>,
    ) -> Result<Schedule, CoreError> {
        capture.validate()?;

        let schedule = self.get_schedule(schedule_id, &actor).await?;
        let expected = check_version("schedule", schedule_id, schedule.version, expected_version)?;
        if schedule.schedule_type != ScheduleType::Inspection {
            return Err(CoreError::Validation(format!(
                "Schedule {schedule_id} is a {} and has no location capture",
                schedule.schedule_type
            )));
        }
        let edge = workflow::schedule::check(
            schedule.status,
            ScheduleStatus::InProgress,
            actor.role,
            None,
        )?;
        if schedule.assigned_to != Some(actor.user_id) {
            return Err(CoreError::Forbidden(format!(
                "Only the assigned inspector may start inspection {schedule_id}"
            )));
        }

        let store = self.ctx.store();
        let user_id = actor.user_id;
        let active = self
            .ctx
            .retry(move || store.list_active_schedules_for(user_id))
            .await?;
        // A racing start of this same schedule is settled by the versioned write.
        if let Some(other) = active.iter().find(|s| s.id != schedule_id) {
            return Err(CoreError::Conflict(format!(
                "Inspection {} is already in progress for this user",
                other.id
            )));
        }

        let location = NewInspectionLocation::from_capture(&capture, actor.user_id);
        let audit = NewTransition::new(
            EntityKind::Schedule,
            schedule_id,
            schedule.status,
            edge.to,
            actor,
            None,
        );
        let (location, audit) = (&location, &audit);
        let started = self
            .ctx
            .retry(move || store.start_inspection(schedule_id, expected, location, audit))
            .await?;

        tracing::info!(
            schedule_id,
            project_id = started.project_id,
            inspector_id = actor.user_id,
            location_kind = %capture.kind(),
            "Inspection started"
        );

        self.notify_schedule(
            &started,
            kinds::INSPECTION_STARTED,
            format!("Inspection {schedule_id} started ({} location)", capture.kind()),
            actor,
        )
        .await;

        self.auto_advance(
            started.project_id,
            ProjectStatus::InspectionScheduled,
            ProjectStatus::InspectionInProgress,
            actor,
        )
        .await;

        Ok(started)
    }

    pub async fn complete_schedule(
        &self,
        schedule_id: DbId,
        actor: Actor,
        notes: Option<String>,
        expected_version: Option<i32>,
    ) -> Result<Schedule, CoreError> {
        let mut request = TransitionRequest::new(ScheduleStatus::Completed, actor);
        request.notes = notes;
        request.expected_version = expected_version;
        self.request_transition(schedule_id, request).await
    }

    pub async fn cancel_schedule(
        &self,
        schedule_id: DbId,
        actor: Actor,
        notes: Option<String>,
        expected_version: Option<i32>,
    ) -> Result<Schedule, CoreError> {
        let mut request = TransitionRequest::new(ScheduleStatus::Cancelled, actor);
        request.notes = notes;
        request.expected_version = expected_version;
        self.request_transition(schedule_id, request).await
    }

    /// Generic schedule transition.
    ///
    /// Inspections must be started through [`Self::start_inspection`] since
    /// the start carries a location.
    pub async fn request_transition(
        &self,
        schedule_id: DbId,
        request: TransitionRequest<ScheduleStatus>,
    ) -> Result<Schedule, CoreError> {
        let actor = request.actor;
        let schedule = self.get_schedule(schedule_id, &actor).await?;
        let expected = check_version(
            "schedule",
            schedule_id,
            schedule.version,
            request.expected_version,
        )?;
        let edge =
            workflow::schedule::check(schedule.status, request.target, actor.role, request.notes())?;

        if edge.to == ScheduleStatus::InProgress {
            if schedule.schedule_type == ScheduleType::Inspection {
                return Err(CoreError::MissingPayload(
                    "inspection start requires a location capture".to_string(),
                ));
            }
            if schedule.assigned_to.is_some_and(|id| id != actor.user_id)
                && !ASSIGNER_ROLES.contains(&actor.role)
            {
                return Err(CoreError::Forbidden(format!(
                    "Schedule {schedule_id} is assigned to someone else"
                )));
            }
        }

        let notes = clean_notes(request.notes());
        let change = ScheduleTransition {
            to: edge.to,
            audit: NewTransition::new(
                EntityKind::Schedule,
                schedule_id,
                schedule.status,
                edge.to,
                actor,
                notes.clone(),
            ),
        };
        let store = self.ctx.store();
        let change = &change;
        let updated = self
            .ctx
            .retry(move || store.apply_schedule_transition(schedule_id, expected, change))
            .await?;

        tracing::info!(
            schedule_id,
            project_id = updated.project_id,
            from = %schedule.status,
            to = %updated.status,
            actor_id = actor.user_id,
            "Schedule transitioned"
        );

        let is_inspection = updated.schedule_type == ScheduleType::Inspection;
        match updated.status {
            ScheduleStatus::Completed if is_inspection => {
                self.notify_schedule(
                    &updated,
                    kinds::INSPECTION_COMPLETED,
                    format!("Inspection {schedule_id} completed"),
                    actor,
                )
                .await;
                if self.all_inspections_closed(updated.project_id).await {
                    self.auto_advance(
                        updated.project_id,
                        ProjectStatus::InspectionInProgress,
                        ProjectStatus::InspectionCompleted,
                        actor,
                    )
                    .await;
                }
            }
            ScheduleStatus::Cancelled => {
                self.notify_schedule(
                    &updated,
                    kinds::SCHEDULE_CANCELLED,
                    format!(
                        "Schedule {schedule_id} was cancelled: {}",
                        notes.as_deref().unwrap_or_default()
                    ),
                    actor,
                )
                .await;
            }
            _ => {}
        }

        Ok(updated)
    }

    async fn notify_schedule(
        &self,
        schedule: &Schedule,
        kind: &'static str,
        message: String,
        actor: Actor,
    ) {
        let lead = match self.ctx.visible_project(schedule.project_id, &actor).await {
            Ok(project) => project.project_lead_id,
            Err(_) => None,
        };
        let event = WorkflowEvent::new(kind, EntityKind::Schedule, schedule.id, message)
            .by(actor)
            .to(Recipient::User(schedule.created_by))
            .to_user(schedule.assigned_to)
            .to_user(lead)
            .with_payload(serde_json::json!({
                "project_id": schedule.project_id,
                "status": schedule.status,
            }));
        self.ctx.notify(event).await;
    }

    async fn all_inspections_closed(&self, project_id: DbId) -> bool {
        let store = self.ctx.store();
        match self.ctx.retry(move || store.list_schedules(project_id)).await {
            Ok(schedules) => schedules
                .iter()
                .filter(|s| s.schedule_type == ScheduleType::Inspection)
                .all(|s| workflow::schedule::is_terminal(s.status)),
            Err(e) => {
                tracing::warn!(error = %e, project_id, "Failed to load schedules for auto-advance");
                false
            }
        }
    }

    /// Move the project from `from` to `to` when auto-advance is on.
    ///
    /// Manual transitions stay authoritative: a project that is not in
    /// `from`, or an actor the edge does not allow, leaves it where it is.
    async fn auto_advance(
        &self,
        project_id: DbId,
        from: ProjectStatus,
        to: ProjectStatus,
        actor: Actor,
    ) {
        if !self.ctx.settings.auto_advance {
            return;
        }
        let store = self.ctx.store();
        let project = match self.ctx.retry(move || store.get_project(project_id)).await {
            Ok(project) if project.status == from => project,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(error = %e, project_id, "Failed to load project for auto-advance");
                return;
            }
        };

        let request = TransitionRequest::new(to, actor).at_version(project.version);
        match self.engine.request_project_transition(project_id, request).await {
            Ok(updated) => {
                tracing::info!(project_id, status = %updated.status, "Project auto-advanced");
            }
            Err(e) => {
                tracing::debug!(error = %e, project_id, target = %to, "Project not auto-advanced");
            }
        }
    }
}
