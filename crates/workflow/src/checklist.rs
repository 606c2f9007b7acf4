//! Inspection checklist items and responses.

use slf_core::checklist::{validate_item_schema, validate_response};
use slf_core::error::CoreError;
use slf_core::roles::Role;
use slf_core::status::{ResponseStatus, ScheduleStatus, ScheduleType};
use slf_core::types::{Actor, DbId};
use slf_db::models::checklist::{
    ChecklistItem, ChecklistResponse, CreateChecklistItem, UpsertChecklistResponse,
};

use crate::context::{require_role, Context};

const ITEM_EDITORS: &[Role] = &[Role::AdminTeam, Role::AdminLead];

#[derive(Clone)]
pub struct ChecklistService {
    ctx: Context,
}

impl ChecklistService {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub async fn create_item(
        &self,
        mut input: CreateChecklistItem,
        actor: Actor,
    ) -> Result<ChecklistItem, CoreError> {
        require_role(&actor, ITEM_EDITORS, "edit the checklist")?;
        input.code = input.code.trim().to_string();
        if input.code.is_empty() || input.label.trim().is_empty() {
            return Err(CoreError::Validation(
                "Checklist items need a code and a label".to_string(),
            ));
        }
        validate_item_schema(&input.schema())?;

        let store = self.ctx.store();
        let input = &input;
        let item = self
            .ctx
            .retry(move || store.create_checklist_item(input))
            .await?;

        tracing::info!(
            item_id = item.id,
            code = %item.code,
            kind = %item.response_kind,
            "Checklist item created"
        );
        Ok(item)
    }

    pub async fn list_items(&self) -> Result<Vec<ChecklistItem>, CoreError> {
        let store = self.ctx.store();
        self.ctx.retry(move || store.list_checklist_items()).await
    }

    /// Save the actor's answer to one item of an inspection.
    ///
    /// Repeated saves replace the previous answer; `submit` marks it final
    /// for the report but does not lock it while the inspection runs.
    pub async fn save_response(
        &self,
        schedule_id: DbId,
        item_id: DbId,
        actor: Actor,
        payload: serde_json::Value,
        submit: bool,
    ) -> Result<ChecklistResponse, CoreError> {
        let store = self.ctx.store();
        let schedule = self.ctx.retry(move || store.get_schedule(schedule_id)).await?;
        self.ctx.visible_project(schedule.project_id, &actor).await?;

        if schedule.schedule_type != ScheduleType::Inspection
            || schedule.status != ScheduleStatus::InProgress
        {
            return Err(CoreError::Conflict(format!(
                "Checklist answers are only accepted while inspection {schedule_id} is in progress"
            )));
        }
        if schedule.assigned_to != Some(actor.user_id) {
            return Err(CoreError::Forbidden(format!(
                "Only the assigned inspector may answer the checklist of schedule {schedule_id}"
            )));
        }

        let item = self.ctx.retry(move || store.get_checklist_item(item_id)).await?;
        validate_response(&item.schema(), &payload)?;

        let input = UpsertChecklistResponse {
            schedule_id,
            item_id,
            responder_id: actor.user_id,
            payload,
            status: if submit {
                ResponseStatus::Submitted
            } else {
                ResponseStatus::Draft
            },
        };
        let input = &input;
        let response = self
            .ctx
            .retry(move || store.upsert_checklist_response(input))
            .await?;

        tracing::debug!(
            schedule_id,
            item_id,
            response_id = response.id,
            status = %response.status,
            "Checklist response saved"
        );
        Ok(response)
    }

    pub async fn list_responses(
        &self,
        schedule_id: DbId,
        actor: &Actor,
    ) -> Result<Vec<ChecklistResponse>, CoreError> {
        let store = self.ctx.store();
        let schedule = self.ctx.retry(move || store.get_schedule(schedule_id)).await?;
        self.ctx.visible_project(schedule.project_id, actor).await?;
        self.ctx
            .retry(move || store.list_checklist_responses(schedule_id))
            .await
    }
}
