//! PostgreSQL-backed [`EntityStore`], delegating to the repositories.

use async_trait::async_trait;
use slf_core::access::ProjectScope;
use slf_core::error::CoreError;
use slf_core::roles::Role;
use slf_core::status::EntityKind;
use slf_core::types::DbId;
use sqlx::PgPool;

use super::{EntityStore, StoreResult};
use crate::models::approval::{
    ApprovalStep, ChainWithSteps, CloseReview, OpenReview, RecordDecision, ReviewedEntity,
    SubjectChange,
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
use crate::repositories::approval_repo::ClosedReview;
use crate::repositories::{
    ApprovalRepo, ChecklistRepo, DocumentRepo, NotificationRepo, ProjectRepo, ReportRepo,
    ScheduleRepo, TeamRepo, TransitionRepo, UserRepo,
};

const ACTIVE_ASSIGNEE_INDEX: &str = "uq_schedules_active_assignee";
const IN_FLIGHT_CHAIN_INDEX: &str = "uq_approval_chains_in_flight";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a driver error onto the domain taxonomy.
pub(crate) fn classify(err: sqlx::Error) -> CoreError {
    match err {
        sqlx::Error::RowNotFound => CoreError::Internal("Expected row was not returned".into()),
        sqlx::Error::Database(db) => {
            let constraint = db.constraint().unwrap_or("constraint").to_string();
            if db.is_unique_violation() {
                CoreError::Conflict(format!("Duplicate value violates {constraint}"))
            } else if db.is_foreign_key_violation() {
                CoreError::Validation(format!("Referenced row does not exist ({constraint})"))
            } else if db.is_check_violation() {
                CoreError::Validation(format!("Value violates {constraint}"))
            } else {
                tracing::error!(code = ?db.code(), error = %db, "Unexpected database error");
                CoreError::Internal(db.to_string())
            }
        }
        e @ (sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Protocol(_)) => {
            tracing::debug!(error = %e, "Database unreachable");
            CoreError::StorageUnavailable(e.to_string())
        }
        other => CoreError::Internal(other.to_string()),
    }
}

fn violates(err: &sqlx::Error, index: &str) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation() && db.constraint() == Some(index))
}

fn found<T>(row: Option<T>, entity: &'static str, id: DbId) -> StoreResult<T> {
    row.ok_or(CoreError::NotFound { entity, id })
}

impl PgStore {
    /// Explain why the compare-and-swap on a reviewed entity matched no row.
    async fn subject_missed(&self, change: &SubjectChange, id: DbId, expected: i32) -> CoreError {
        match change {
            SubjectChange::Project(_) => missed(
                ProjectRepo::current_version(&self.pool, id).await,
                "project",
                id,
                expected,
            ),
            SubjectChange::Report(_) => missed(
                ReportRepo::current_version(&self.pool, id).await,
                "report",
                id,
                expected,
            ),
        }
    }
}

/// Explain why a compare-and-swap matched no row.
fn missed(
    current: Result<Option<i32>, sqlx::Error>,
    entity: &'static str,
    id: DbId,
    expected: i32,
) -> CoreError {
    match current {
        Ok(Some(_)) => CoreError::StaleState {
            entity,
            id,
            expected,
        },
        Ok(None) => CoreError::NotFound { entity, id },
        Err(e) => classify(e),
    }
}

#[async_trait]
impl EntityStore for PgStore {
    // ── Users and teams ──

    async fn create_user(&self, input: &CreateUser) -> StoreResult<User> {
        UserRepo::create(&self.pool, input).await.map_err(classify)
    }

    async fn get_user(&self, id: DbId) -> StoreResult<User> {
        let user = UserRepo::find_by_id(&self.pool, id).await.map_err(classify)?;
        found(user, "user", id)
    }

    async fn list_users_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        UserRepo::list_by_role(&self.pool, role).await.map_err(classify)
    }

    async fn add_team_member(&self, project_id: DbId, user_id: DbId) -> StoreResult<()> {
        self.get_project(project_id).await?;
        self.get_user(user_id).await?;
        TeamRepo::add(&self.pool, project_id, user_id)
            .await
            .map_err(classify)
    }

    async fn is_team_member(&self, project_id: DbId, user_id: DbId) -> StoreResult<bool> {
        TeamRepo::is_member(&self.pool, project_id, user_id)
            .await
            .map_err(classify)
    }

    async fn list_team_members(&self, project_id: DbId) -> StoreResult<Vec<User>> {
        TeamRepo::list_members(&self.pool, project_id)
            .await
            .map_err(classify)
    }

    // ── Projects ──

    async fn create_project(&self, input: &CreateProject) -> StoreResult<Project> {
        ProjectRepo::create(&self.pool, input).await.map_err(classify)
    }

    async fn get_project(&self, id: DbId) -> StoreResult<Project> {
        let project = ProjectRepo::find_by_id(&self.pool, id)
            .await
            .map_err(classify)?;
        found(project, "project", id)
    }

    async fn list_projects(
        &self,
        filter: &ProjectFilter,
        scope: ProjectScope,
    ) -> StoreResult<Vec<Project>> {
        ProjectRepo::list(&self.pool, filter, scope)
            .await
            .map_err(classify)
    }

    async fn apply_project_transition(
        &self,
        id: DbId,
        expected_version: i32,
        change: &ProjectTransition,
    ) -> StoreResult<Project> {
        match ProjectRepo::apply_transition(&self.pool, id, expected_version, change)
            .await
            .map_err(classify)?
        {
            Some(project) => Ok(project),
            None => Err(missed(
                ProjectRepo::current_version(&self.pool, id).await,
                "project",
                id,
                expected_version,
            )),
        }
    }

    // ── Documents ──

    async fn create_document(&self, input: &CreateDocument) -> StoreResult<Document> {
        if let Some(project_id) = input.project_id {
            self.get_project(project_id).await?;
        }
        DocumentRepo::create(&self.pool, input).await.map_err(classify)
    }

    async fn get_document(&self, id: DbId) -> StoreResult<Document> {
        let doc = DocumentRepo::find_by_id(&self.pool, id)
            .await
            .map_err(classify)?;
        found(doc, "document", id)
    }

    async fn find_document(
        &self,
        project_id: DbId,
        category: &str,
    ) -> StoreResult<Option<Document>> {
        DocumentRepo::find_by_category(&self.pool, project_id, category)
            .await
            .map_err(classify)
    }

    async fn list_documents(&self, project_id: DbId) -> StoreResult<Vec<Document>> {
        DocumentRepo::list_by_project(&self.pool, project_id)
            .await
            .map_err(classify)
    }

    async fn update_document(
        &self,
        id: DbId,
        expected_version: i32,
        change: &DocumentChange,
    ) -> StoreResult<Document> {
        match DocumentRepo::update(&self.pool, id, expected_version, change)
            .await
            .map_err(classify)?
        {
            Some(doc) => Ok(doc),
            None => Err(missed(
                DocumentRepo::current_version(&self.pool, id).await,
                "document",
                id,
                expected_version,
            )),
        }
    }

    // ── Schedules ──

    async fn create_schedule(&self, input: &CreateSchedule) -> StoreResult<Schedule> {
        self.get_project(input.project_id).await?;
        ScheduleRepo::create(&self.pool, input)
            .await
            .map_err(classify)
    }

    async fn get_schedule(&self, id: DbId) -> StoreResult<Schedule> {
        let schedule = ScheduleRepo::find_by_id(&self.pool, id)
            .await
            .map_err(classify)?;
        found(schedule, "schedule", id)
    }

    async fn list_schedules(&self, project_id: DbId) -> StoreResult<Vec<Schedule>> {
        ScheduleRepo::list_by_project(&self.pool, project_id)
            .await
            .map_err(classify)
    }

    async fn list_active_schedules_for(&self, user_id: DbId) -> StoreResult<Vec<Schedule>> {
        ScheduleRepo::list_active_for(&self.pool, user_id)
            .await
            .map_err(classify)
    }

    async fn set_schedule_assignee(
        &self,
        id: DbId,
        expected_version: i32,
        user_id: DbId,
    ) -> StoreResult<Schedule> {
        match ScheduleRepo::set_assignee(&self.pool, id, expected_version, user_id)
            .await
            .map_err(classify)?
        {
            Some(schedule) => Ok(schedule),
            None => Err(missed(
                ScheduleRepo::current_version(&self.pool, id).await,
                "schedule",
                id,
                expected_version,
            )),
        }
    }

    async fn start_inspection(
        &self,
        id: DbId,
        expected_version: i32,
        location: &NewInspectionLocation,
        audit: &NewTransition,
    ) -> StoreResult<Schedule> {
        let result =
            ScheduleRepo::start_inspection(&self.pool, id, expected_version, location, audit).await;
        match result {
            Ok(Some(schedule)) => Ok(schedule),
            Ok(None) => Err(missed(
                ScheduleRepo::current_version(&self.pool, id).await,
                "schedule",
                id,
                expected_version,
            )),
            Err(e) if violates(&e, ACTIVE_ASSIGNEE_INDEX) => Err(CoreError::Conflict(format!(
                "User {} already has an inspection in progress",
                location.captured_by
            ))),
            Err(e) => Err(classify(e)),
        }
    }

    async fn apply_schedule_transition(
        &self,
        id: DbId,
        expected_version: i32,
        change: &ScheduleTransition,
    ) -> StoreResult<Schedule> {
        match ScheduleRepo::apply_transition(&self.pool, id, expected_version, change)
            .await
            .map_err(classify)?
        {
            Some(schedule) => Ok(schedule),
            None => Err(missed(
                ScheduleRepo::current_version(&self.pool, id).await,
                "schedule",
                id,
                expected_version,
            )),
        }
    }

    async fn get_inspection_location(
        &self,
        schedule_id: DbId,
    ) -> StoreResult<Option<InspectionLocation>> {
        ScheduleRepo::find_location(&self.pool, schedule_id)
            .await
            .map_err(classify)
    }

    // ── Checklists ──

    async fn create_checklist_item(
        &self,
        input: &CreateChecklistItem,
    ) -> StoreResult<ChecklistItem> {
        ChecklistRepo::create_item(&self.pool, input)
            .await
            .map_err(classify)
    }

    async fn get_checklist_item(&self, id: DbId) -> StoreResult<ChecklistItem> {
        let item = ChecklistRepo::find_item(&self.pool, id)
            .await
            .map_err(classify)?;
        found(item, "checklist item", id)
    }

    async fn list_checklist_items(&self) -> StoreResult<Vec<ChecklistItem>> {
        ChecklistRepo::list_items(&self.pool).await.map_err(classify)
    }

    async fn upsert_checklist_response(
        &self,
        input: &UpsertChecklistResponse,
    ) -> StoreResult<ChecklistResponse> {
        ChecklistRepo::upsert_response(&self.pool, input)
            .await
            .map_err(classify)
    }

    async fn list_checklist_responses(
        &self,
        schedule_id: DbId,
    ) -> StoreResult<Vec<ChecklistResponse>> {
        ChecklistRepo::list_responses(&self.pool, schedule_id)
            .await
            .map_err(classify)
    }

    // ── Reports ──

    async fn create_report(&self, input: &CreateReport) -> StoreResult<Report> {
        self.get_project(input.project_id).await?;
        ReportRepo::create(&self.pool, input).await.map_err(classify)
    }

    async fn get_report(&self, id: DbId) -> StoreResult<Report> {
        let report = ReportRepo::find_by_id(&self.pool, id)
            .await
            .map_err(classify)?;
        found(report, "report", id)
    }

    async fn list_reports(&self, project_id: DbId) -> StoreResult<Vec<Report>> {
        ReportRepo::list_by_project(&self.pool, project_id)
            .await
            .map_err(classify)
    }

    async fn apply_report_transition(
        &self,
        id: DbId,
        expected_version: i32,
        change: &ReportTransition,
    ) -> StoreResult<Report> {
        match ReportRepo::apply_transition(&self.pool, id, expected_version, change)
            .await
            .map_err(classify)?
        {
            Some(report) => Ok(report),
            None => Err(missed(
                ReportRepo::current_version(&self.pool, id).await,
                "report",
                id,
                expected_version,
            )),
        }
    }

    async fn set_report_findings(
        &self,
        id: DbId,
        expected_version: i32,
        findings: &[DbId],
    ) -> StoreResult<Report> {
        match ReportRepo::set_findings(&self.pool, id, expected_version, findings)
            .await
            .map_err(classify)?
        {
            Some(report) => Ok(report),
            None => Err(missed(
                ReportRepo::current_version(&self.pool, id).await,
                "report",
                id,
                expected_version,
            )),
        }
    }

    // ── Approval chains ──

    async fn open_review(
        &self,
        input: &OpenReview,
    ) -> StoreResult<(ChainWithSteps, ReviewedEntity)> {
        let target = &input.chain;
        match ApprovalRepo::open_review(&self.pool, input).await {
            Ok(Some(opened)) => Ok(opened),
            Ok(None) => Err(self
                .subject_missed(&input.change, target.entity_id, input.expected_version)
                .await),
            Err(e) if violates(&e, IN_FLIGHT_CHAIN_INDEX) => Err(CoreError::ChainInProgress {
                entity: target.entity_type.as_str(),
                id: target.entity_id,
            }),
            Err(e) => Err(classify(e)),
        }
    }

    async fn get_active_chain(
        &self,
        entity_type: EntityKind,
        entity_id: DbId,
    ) -> StoreResult<Option<ChainWithSteps>> {
        ApprovalRepo::find_active(&self.pool, entity_type, entity_id)
            .await
            .map_err(classify)
    }

    async fn list_chains(
        &self,
        entity_type: EntityKind,
        entity_id: DbId,
    ) -> StoreResult<Vec<ChainWithSteps>> {
        ApprovalRepo::list_for_entity(&self.pool, entity_type, entity_id)
            .await
            .map_err(classify)
    }

    async fn record_step_decision(&self, input: &RecordDecision) -> StoreResult<ApprovalStep> {
        ApprovalRepo::record_decision(&self.pool, input)
            .await
            .map_err(classify)?
            .ok_or(CoreError::StaleState {
                entity: "approval step",
                id: input.chain_id,
                expected: input.position,
            })
    }

    async fn close_review(
        &self,
        input: &CloseReview,
    ) -> StoreResult<(ApprovalStep, ReviewedEntity)> {
        match ApprovalRepo::close_review(&self.pool, input)
            .await
            .map_err(classify)?
        {
            ClosedReview::Closed(step, entity) => Ok((step, entity)),
            ClosedReview::StepNotPending => Err(CoreError::StaleState {
                entity: "approval step",
                id: input.decision.chain_id,
                expected: input.decision.position,
            }),
            ClosedReview::EntityMoved => Err(self
                .subject_missed(&input.change, input.entity_id, input.expected_version)
                .await),
        }
    }

    // ── Notifications ──

    async fn create_notification(&self, input: &NewNotification) -> StoreResult<Notification> {
        NotificationRepo::create(&self.pool, input)
            .await
            .map_err(classify)
    }

    async fn list_notifications(
        &self,
        recipient_id: DbId,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        NotificationRepo::list_for_user(&self.pool, recipient_id, unread_only)
            .await
            .map_err(classify)
    }

    async fn mark_notification_read(&self, id: DbId, recipient_id: DbId) -> StoreResult<bool> {
        NotificationRepo::mark_read(&self.pool, id, recipient_id)
            .await
            .map_err(classify)
    }

    async fn unread_count(&self, recipient_id: DbId) -> StoreResult<i64> {
        NotificationRepo::unread_count(&self.pool, recipient_id)
            .await
            .map_err(classify)
    }

    // ── Audit ──

    async fn list_transitions(
        &self,
        entity_type: EntityKind,
        entity_id: DbId,
    ) -> StoreResult<Vec<StatusTransition>> {
        TransitionRepo::list_for_entity(&self.pool, entity_type, entity_id)
            .await
            .map_err(classify)
    }
}
