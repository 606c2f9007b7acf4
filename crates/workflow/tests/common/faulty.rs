use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use slf_core::access::ProjectScope;
use slf_core::error::CoreError;
use slf_core::roles::Role;
use slf_core::status::EntityKind;
use slf_core::types::DbId;
use slf_db::models::approval::{
    ApprovalStep, ChainWithSteps, CloseReview, OpenReview, RecordDecision, ReviewedEntity,
};
use slf_db::models::checklist::{
    ChecklistItem, ChecklistResponse, CreateChecklistItem, UpsertChecklistResponse,
};
use slf_db::models::document::{CreateDocument, Document, DocumentChange};
use slf_db::models::notification::{NewNotification, Notification};
use slf_db::models::project::{CreateProject, Project, ProjectFilter, ProjectTransition};
use slf_db::models::report::{CreateReport, Report, ReportTransition};
use slf_db::models::schedule::{
    CreateSchedule, InspectionLocation, NewInspectionLocation, Schedule, ScheduleTransition,
};
use slf_db::models::transition::{NewTransition, StatusTransition};
use slf_db::models::user::{CreateUser, User};
use slf_db::store::{EntityStore, MemoryStore, StoreResult};

/// A [`MemoryStore`] whose named operations can be made to fail with
/// `StorageUnavailable` before they touch any state.
pub struct FaultyStore {
    inner: Arc<MemoryStore>,
    failing: Mutex<HashSet<&'static str>>,
}

impl FaultyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    fn gate(&self, op: &'static str) -> StoreResult<()> {
        if self.failing.lock().unwrap().contains(op) {
            return Err(CoreError::StorageUnavailable(format!("{op} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for FaultyStore {
    async fn create_user(&self, input: &CreateUser) -> StoreResult<User> {
        self.gate("create_user")?;
        self.inner.create_user(input).await
    }

    async fn get_user(&self, id: DbId) -> StoreResult<User> {
        self.gate("get_user")?;
        self.inner.get_user(id).await
    }

    async fn list_users_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        self.gate("list_users_by_role")?;
        self.inner.list_users_by_role(role).await
    }

    async fn add_team_member(&self, project_id: DbId, user_id: DbId) -> StoreResult<()> {
        self.gate("add_team_member")?;
        self.inner.add_team_member(project_id, user_id).await
    }

    async fn is_team_member(&self, project_id: DbId, user_id: DbId) -> StoreResult<bool> {
        self.gate("is_team_member")?;
        self.inner.is_team_member(project_id, user_id).await
    }

    async fn list_team_members(&self, project_id: DbId) -> StoreResult<Vec<User>> {
        self.gate("list_team_members")?;
        self.inner.list_team_members(project_id).await
    }

    async fn create_project(&self, input: &CreateProject) -> StoreResult<Project> {
        self.gate("create_project")?;
        self.inner.create_project(input).await
    }

    async fn get_project(&self, id: DbId) -> StoreResult<Project> {
        self.gate("get_project")?;
        self.inner.get_project(id).await
    }

    async fn list_projects(
        &self,
        filter: &ProjectFilter,
        scope: ProjectScope,
    ) -> StoreResult<Vec<Project>> {
        self.gate("list_projects")?;
        self.inner.list_projects(filter, scope).await
    }

    async fn apply_project_transition(
        &self,
        id: DbId,
        expected_version: i32,
        change: &ProjectTransition,
    ) -> StoreResult<Project> {
        self.gate("apply_project_transition")?;
        self.inner.apply_project_transition(id, expected_version, change).await
    }

    async fn create_document(&self, input: &CreateDocument) -> StoreResult<Document> {
        self.gate("create_document")?;
        self.inner.create_document(input).await
    }

    async fn get_document(&self, id: DbId) -> StoreResult<Document> {
        self.gate("get_document")?;
        self.inner.get_document(id).await
    }

    async fn find_document(
        &self,
        project_id: DbId,
        category: &str,
    ) -> StoreResult<Option<Document>> {
        self.gate("find_document")?;
        self.inner.find_document(project_id, category).await
    }

    async fn list_documents(&self, project_id: DbId) -> StoreResult<Vec<Document>> {
        self.gate("list_documents")?;
        self.inner.list_documents(project_id).await
    }

    async fn update_document(
        &self,
        id: DbId,
        expected_version: i32,
        change: &DocumentChange,
    ) -> StoreResult<Document> {
        self.gate("update_document")?;
        self.inner.update_document(id, expected_version, change).await
    }

    async fn create_schedule(&self, input: &CreateSchedule) -> StoreResult<Schedule> {
        self.gate("create_schedule")?;
        self.inner.create_schedule(input).await
    }

    async fn get_schedule(&self, id: DbId) -> StoreResult<Schedule> {
        self.gate("get_schedule")?;
        self.inner.get_schedule(id).await
    }

    async fn list_schedules(&self, project_id: DbId) -> StoreResult<Vec<Schedule>> {
        self.gate("list_schedules")?;
        self.inner.list_schedules(project_id).await
    }

    async fn list_active_schedules_for(&self, user_id: DbId) -> StoreResult<Vec<Schedule>> {
        self.gate("list_active_schedules_for")?;
        self.inner.list_active_schedules_for(user_id).await
    }

    async fn set_schedule_assignee(
        &self,
        id: DbId,
        expected_version: i32,
        user_id: DbId,
    ) -> StoreResult<Schedule> {
        self.gate("set_schedule_assignee")?;
        self.inner.set_schedule_assignee(id, expected_version, user_id).await
    }

    async fn start_inspection(
        &self,
        id: DbId,
        expected_version: i32,
        location: &NewInspectionLocation,
        audit: &NewTransition,
    ) -> StoreResult<Schedule> {
        self.gate("start_inspection")?;
        self.inner.start_inspection(id, expected_version, location, audit).await
    }

    async fn apply_schedule_transition(
        &self,
        id: DbId,
        expected_version: i32,
        change: &ScheduleTransition,
    ) -> StoreResult<Schedule> {
        self.gate("apply_schedule_transition")?;
        self.inner.apply_schedule_transition(id, expected_version, change).await
    }

    async fn get_inspection_location(
        &self,
        schedule_id: DbId,
    ) -> StoreResult<Option<InspectionLocation>> {
        self.gate("get_inspection_location")?;
        self.inner.get_inspection_location(schedule_id).await
    }

    async fn create_checklist_item(
        &self,
        input: &CreateChecklistItem,
    ) -> StoreResult<ChecklistItem> {
        self.gate("create_checklist_item")?;
        self.inner.create_checklist_item(input).await
    }

    async fn get_checklist_item(&self, id: DbId) -> StoreResult<ChecklistItem> {
        self.gate("get_checklist_item")?;
        self.inner.get_checklist_item(id).await
    }

    async fn list_checklist_items(&self) -> StoreResult<Vec<ChecklistItem>> {
        self.gate("list_checklist_items")?;
        self.inner.list_checklist_items().await
    }

    async fn upsert_checklist_response(
        &self,
        input: &UpsertChecklistResponse,
    ) -> StoreResult<ChecklistResponse> {
        self.gate("upsert_checklist_response")?;
        self.inner.upsert_checklist_response(input).await
    }

    async fn list_checklist_responses(
        &self,
        schedule_id: DbId,
    ) -> StoreResult<Vec<ChecklistResponse>> {
        self.gate("list_checklist_responses")?;
        self.inner.list_checklist_responses(schedule_id).await
    }

    async fn create_report(&self, input: &CreateReport) -> StoreResult<Report> {
        self.gate("create_report")?;
        self.inner.create_report(input).await
    }

    async fn get_report(&self, id: DbId) -> StoreResult<Report> {
        self.gate("get_report")?;
        self.inner.get_report(id).await
    }

    async fn list_reports(&self, project_id: DbId) -> StoreResult<Vec<Report>> {
        self.gate("list_reports")?;
        self.inner.list_reports(project_id).await
    }

    async fn apply_report_transition(
        &self,
        id: DbId,
        expected_version: i32,
        change: &ReportTransition,
    ) -> StoreResult<Report> {
        self.gate("apply_report_transition")?;
        self.inner.apply_report_transition(id, expected_version, change).await
    }

    async fn set_report_findings(
        &self,
        id: DbId,
        expected_version: i32,
        findings: &[DbId],
    ) -> StoreResult<Report> {
        self.gate("set_report_findings")?;
        self.inner.set_report_findings(id, expected_version, findings).await
    }

    async fn open_review(
        &self,
        input: &OpenReview,
    ) -> StoreResult<(ChainWithSteps, ReviewedEntity)> {
        self.gate("open_review")?;
        self.inner.open_review(input).await
    }

    async fn get_active_chain(
        &self,
        entity_type: EntityKind,
        entity_id: DbId,
    ) -> StoreResult<Option<ChainWithSteps>> {
        self.gate("get_active_chain")?;
        self.inner.get_active_chain(entity_type, entity_id).await
    }

    async fn list_chains(
        &self,
        entity_type: EntityKind,
        entity_id: DbId,
    ) -> StoreResult<Vec<ChainWithSteps>> {
        self.gate("list_chains")?;
        self.inner.list_chains(entity_type, entity_id).await
    }

    async fn record_step_decision(&self, input: &RecordDecision) -> StoreResult<ApprovalStep> {
        self.gate("record_step_decision")?;
        self.inner.record_step_decision(input).await
    }

    async fn close_review(
        &self,
        input: &CloseReview,
    ) -> StoreResult<(ApprovalStep, ReviewedEntity)> {
        self.gate("close_review")?;
        self.inner.close_review(input).await
    }

    async fn create_notification(&self, input: &NewNotification) -> StoreResult<Notification> {
        self.gate("create_notification")?;
        self.inner.create_notification(input).await
    }

    async fn list_notifications(
        &self,
        recipient_id: DbId,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        self.gate("list_notifications")?;
        self.inner.list_notifications(recipient_id, unread_only).await
    }

    async fn mark_notification_read(&self, id: DbId, recipient_id: DbId) -> StoreResult<bool> {
        self.gate("mark_notification_read")?;
        self.inner.mark_notification_read(id, recipient_id).await
    }

    async fn unread_count(&self, recipient_id: DbId) -> StoreResult<i64> {
        self.gate("unread_count")?;
        self.inner.unread_count(recipient_id).await
    }

    async fn list_transitions(
        &self,
        entity_type: EntityKind,
        entity_id: DbId,
    ) -> StoreResult<Vec<StatusTransition>> {
        self.gate("list_transitions")?;
        self.inner.list_transitions(entity_type, entity_id).await
    }
}
