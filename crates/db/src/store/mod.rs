//! The persistence boundary used by the workflow services.
//!
//! [`EntityStore`] is implemented by [`PgStore`] for production and by
//! [`MemoryStore`] for tests and single-process deployments. Both give the
//! same guarantees:
//!
//! - every versioned write is a compare-and-swap on `version`, and a
//!   mismatch fails with [`CoreError::StaleState`];
//! - a status change and its audit row commit together or not at all;
//! - opening or closing an approval chain moves the reviewed entity in the
//!   same write;
//! - a missing row fails with [`CoreError::NotFound`];
//! - backend I/O failures surface as [`CoreError::StorageUnavailable`].

mod memory;
mod postgres;

use async_trait::async_trait;
use slf_core::access::ProjectScope;
use slf_core::error::CoreError;
use slf_core::roles::Role;
use slf_core::status::EntityKind;
use slf_core::types::DbId;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::approval::{
    ApprovalStep, ChainWithSteps, CloseReview, OpenReview, RecordDecision, ReviewedEntity,
};
use crate::models::checklist::{
    ChecklistItem, ChecklistResponse, CreateChecklistItem, UpsertChecklistResponse,
};
use crate::models::document::{CreateDocument, Document, DocumentChange};
use crate::models::notification::{NewNotification, Notification};
use crate::models::project::{CreateProject, Project, ProjectFilter, ProjectTransition};
use crate::models::report::{CreateReport, Report, ReportTransition};
use crate::models::schedule::{
    CreateSchedule, InspectionLocation, NewInspectionLocation, Schedule, ScheduleTransition,
};
use crate::models::transition::{NewTransition, StatusTransition};
use crate::models::user::{CreateUser, User};

pub type StoreResult<T> = Result<T, CoreError>;

#[async_trait]
pub trait EntityStore: Send + Sync {
    // ── Users and teams ──

    async fn create_user(&self, input: &CreateUser) -> StoreResult<User>;
    async fn get_user(&self, id: DbId) -> StoreResult<User>;
    async fn list_users_by_role(&self, role: Role) -> StoreResult<Vec<User>>;

    /// Idempotent.
    async fn add_team_member(&self, project_id: DbId, user_id: DbId) -> StoreResult<()>;
    async fn is_team_member(&self, project_id: DbId, user_id: DbId) -> StoreResult<bool>;
    async fn list_team_members(&self, project_id: DbId) -> StoreResult<Vec<User>>;

    // ── Projects ──

    async fn create_project(&self, input: &CreateProject) -> StoreResult<Project>;
    async fn get_project(&self, id: DbId) -> StoreResult<Project>;
    async fn list_projects(
        &self,
        filter: &ProjectFilter,
        scope: ProjectScope,
    ) -> StoreResult<Vec<Project>>;
    /// A project leaving a chain-gated state this way abandons its
    /// in-flight chain in the same write.
    async fn apply_project_transition(
        &self,
        id: DbId,
        expected_version: i32,
        change: &ProjectTransition,
    ) -> StoreResult<Project>;

    // ── Documents ──

    async fn create_document(&self, input: &CreateDocument) -> StoreResult<Document>;
    async fn get_document(&self, id: DbId) -> StoreResult<Document>;
    async fn find_document(&self, project_id: DbId, category: &str)
        -> StoreResult<Option<Document>>;
    async fn list_documents(&self, project_id: DbId) -> StoreResult<Vec<Document>>;
    async fn update_document(
        &self,
        id: DbId,
        expected_version: i32,
        change: &DocumentChange,
    ) -> StoreResult<Document>;

    // ── Schedules ──

    async fn create_schedule(&self, input: &CreateSchedule) -> StoreResult<Schedule>;
    async fn get_schedule(&self, id: DbId) -> StoreResult<Schedule>;
    async fn list_schedules(&self, project_id: DbId) -> StoreResult<Vec<Schedule>>;
    /// Schedules currently `in_progress` for an assignee.
    async fn list_active_schedules_for(&self, user_id: DbId) -> StoreResult<Vec<Schedule>>;
    async fn set_schedule_assignee(
        &self,
        id: DbId,
        expected_version: i32,
        user_id: DbId,
    ) -> StoreResult<Schedule>;
    /// Status change to `in_progress` and location capture in one write.
    ///
    /// The version check runs first, so a lost race fails with `StaleState`.
    /// Fails with `Conflict` if the assignee already has an inspection in
    /// progress.
    async fn start_inspection(
        &self,
        id: DbId,
        expected_version: i32,
        location: &NewInspectionLocation,
        audit: &NewTransition,
    ) -> StoreResult<Schedule>;
    async fn apply_schedule_transition(
        &self,
        id: DbId,
        expected_version: i32,
        change: &ScheduleTransition,
    ) -> StoreResult<Schedule>;
    async fn get_inspection_location(
        &self,
        schedule_id: DbId,
    ) -> StoreResult<Option<InspectionLocation>>;

    // ── Checklists ──

    async fn create_checklist_item(&self, input: &CreateChecklistItem)
        -> StoreResult<ChecklistItem>;
    async fn get_checklist_item(&self, id: DbId) -> StoreResult<ChecklistItem>;
    async fn list_checklist_items(&self) -> StoreResult<Vec<ChecklistItem>>;
    /// Atomic insert-or-replace on `(schedule_id, item_id, responder_id)`.
    async fn upsert_checklist_response(
        &self,
        input: &UpsertChecklistResponse,
    ) -> StoreResult<ChecklistResponse>;
    async fn list_checklist_responses(&self, schedule_id: DbId)
        -> StoreResult<Vec<ChecklistResponse>>;

    // ── Reports ──

    async fn create_report(&self, input: &CreateReport) -> StoreResult<Report>;
    async fn get_report(&self, id: DbId) -> StoreResult<Report>;
    async fn list_reports(&self, project_id: DbId) -> StoreResult<Vec<Report>>;
    async fn apply_report_transition(
        &self,
        id: DbId,
        expected_version: i32,
        change: &ReportTransition,
    ) -> StoreResult<Report>;
    async fn set_report_findings(
        &self,
        id: DbId,
        expected_version: i32,
        findings: &[DbId],
    ) -> StoreResult<Report>;

    // ── Approval chains ──

    /// Open a chain and apply the entity's move into review together.
    ///
    /// Fails with `StaleState` if the entity moved, and with
    /// `ChainInProgress` if it already has a chain in flight.
    async fn open_review(&self, input: &OpenReview)
        -> StoreResult<(ChainWithSteps, ReviewedEntity)>;
    async fn get_active_chain(
        &self,
        entity_type: EntityKind,
        entity_id: DbId,
    ) -> StoreResult<Option<ChainWithSteps>>;
    async fn list_chains(
        &self,
        entity_type: EntityKind,
        entity_id: DbId,
    ) -> StoreResult<Vec<ChainWithSteps>>;
    /// Decide a step that leaves the chain in flight.
    ///
    /// Fails with `StaleState` if the step is no longer pending.
    async fn record_step_decision(&self, input: &RecordDecision) -> StoreResult<ApprovalStep>;
    /// Decide the final step, close the chain and apply the entity's
    /// transition with its audit row, all or nothing.
    ///
    /// Fails with `StaleState` if the step is no longer pending or the
    /// entity moved.
    async fn close_review(&self, input: &CloseReview)
        -> StoreResult<(ApprovalStep, ReviewedEntity)>;

    // ── Notifications ──

    async fn create_notification(&self, input: &NewNotification) -> StoreResult<Notification>;
    async fn list_notifications(
        &self,
        recipient_id: DbId,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>>;
    /// `false` if the notification does not exist, belongs to someone else
    /// or was already read.
    async fn mark_notification_read(&self, id: DbId, recipient_id: DbId) -> StoreResult<bool>;
    async fn unread_count(&self, recipient_id: DbId) -> StoreResult<i64>;

    // ── Audit ──

    async fn list_transitions(
        &self,
        entity_type: EntityKind,
        entity_id: DbId,
    ) -> StoreResult<Vec<StatusTransition>>;
}
