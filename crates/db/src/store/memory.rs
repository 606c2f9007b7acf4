//! In-process [`EntityStore`] for tests and single-node deployments.
//!
//! All tables live behind one `tokio::sync::Mutex`, so every trait call is
//! a single atomic step. Version checks and uniqueness rules mirror the
//! Postgres schema.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use slf_core::access::{can_view, ProjectScope};
use slf_core::error::CoreError;
use slf_core::roles::Role;
use slf_core::status::{
    ChainStatus, DocumentStatus, EntityKind, ProjectStatus, ReportStatus, ScheduleStatus,
    StepDecision,
};
use slf_core::types::DbId;
use tokio::sync::Mutex;

use super::{EntityStore, StoreResult};
use crate::models::approval::{
    ApprovalChain, ApprovalStep, ChainWithSteps, CloseReview, NewChain, OpenReview,
    RecordDecision, ReviewedEntity, SubjectChange,
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

#[derive(Default)]
struct Tables {
    next_id: DbId,
    users: BTreeMap<DbId, User>,
    team: BTreeSet<(DbId, DbId)>,
    projects: BTreeMap<DbId, Project>,
    documents: BTreeMap<DbId, Document>,
    schedules: BTreeMap<DbId, Schedule>,
    locations: BTreeMap<DbId, InspectionLocation>,
    checklist_items: BTreeMap<DbId, ChecklistItem>,
    checklist_responses: BTreeMap<(DbId, DbId, DbId), ChecklistResponse>,
    reports: BTreeMap<DbId, Report>,
    chains: BTreeMap<DbId, ApprovalChain>,
    steps: BTreeMap<DbId, Vec<ApprovalStep>>,
    notifications: BTreeMap<DbId, Notification>,
    transitions: Vec<StatusTransition>,
}

impl Tables {
    fn id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn record(&mut self, audit: &NewTransition) {
        let id = self.id();
        self.transitions.push(StatusTransition {
            id,
            entity_type: audit.entity_type,
            entity_id: audit.entity_id,
            from_status: audit.from_status.clone(),
            to_status: audit.to_status.clone(),
            actor_id: audit.actor.user_id,
            actor_role: audit.actor.role,
            notes: audit.notes.clone(),
            created_at: Utc::now(),
        });
    }

    fn require_user(&self, id: DbId) -> StoreResult<&User> {
        self.users
            .get(&id)
            .ok_or(CoreError::NotFound { entity: "user", id })
    }

    fn require_project(&self, id: DbId) -> StoreResult<&Project> {
        self.projects
            .get(&id)
            .ok_or(CoreError::NotFound { entity: "project", id })
    }

    fn chain_with_steps(&self, chain: &ApprovalChain) -> ChainWithSteps {
        ChainWithSteps {
            chain: chain.clone(),
            steps: self.steps.get(&chain.id).cloned().unwrap_or_default(),
        }
    }

    fn transition_project(
        &mut self,
        id: DbId,
        expected: i32,
        change: &ProjectTransition,
    ) -> StoreResult<Project> {
        let project = versioned(&mut self.projects, "project", id, expected, |p| p.version)?;
        project.status = change.to;
        project.rejected_from = change.rejected_from;
        project.rejection_notes = change.rejection_notes.clone();
        project.version += 1;
        project.updated_at = Utc::now();
        let project = project.clone();
        self.record(&change.audit);
        Ok(project)
    }

    fn transition_report(
        &mut self,
        id: DbId,
        expected: i32,
        change: &ReportTransition,
    ) -> StoreResult<Report> {
        let now = Utc::now();
        let report = versioned(&mut self.reports, "report", id, expected, |r| r.version)?;
        report.status = change.to;
        if let Some(review) = &change.review {
            report.reviewed_by = Some(review.reviewed_by);
            report.reviewed_at = Some(now);
            report.review_notes = review.review_notes.clone();
        }
        report.version += 1;
        report.updated_at = now;
        let report = report.clone();
        self.record(&change.audit);
        Ok(report)
    }

    fn check_subject(&self, id: DbId, expected: i32, change: &SubjectChange) -> StoreResult<()> {
        match change {
            SubjectChange::Project(_) => {
                current(&self.projects, "project", id, expected, |p| p.version).map(|_| ())
            }
            SubjectChange::Report(_) => {
                current(&self.reports, "report", id, expected, |r| r.version).map(|_| ())
            }
        }
    }

    fn apply_subject(
        &mut self,
        id: DbId,
        expected: i32,
        change: &SubjectChange,
    ) -> StoreResult<ReviewedEntity> {
        match change {
            SubjectChange::Project(c) => self
                .transition_project(id, expected, c)
                .map(ReviewedEntity::Project),
            SubjectChange::Report(c) => self
                .transition_report(id, expected, c)
                .map(ReviewedEntity::Report),
        }
    }

    fn in_flight_chain(&self, entity_type: EntityKind, entity_id: DbId) -> Option<&ApprovalChain> {
        self.chains.values().find(|c| {
            c.entity_type == entity_type
                && c.entity_id == entity_id
                && c.status == ChainStatus::InFlight
        })
    }

    fn close_chain(&mut self, chain_id: DbId, status: ChainStatus) {
        if let Some(chain) = self.chains.get_mut(&chain_id) {
            chain.status = status;
            chain.closed_at = Some(Utc::now());
        }
    }

    /// Fail unless `input` targets a pending step of an in-flight chain.
    fn check_pending(&self, input: &RecordDecision) -> StoreResult<()> {
        let chain_open = self
            .chains
            .get(&input.chain_id)
            .is_some_and(|c| c.status == ChainStatus::InFlight);
        let pending = self
            .steps
            .get(&input.chain_id)
            .and_then(|steps| steps.iter().find(|s| s.position == input.position))
            .is_some_and(|s| s.decision == StepDecision::Pending);
        if chain_open && pending {
            Ok(())
        } else {
            Err(CoreError::StaleState {
                entity: "approval step",
                id: input.chain_id,
                expected: input.position,
            })
        }
    }

    fn decide_step(&mut self, input: &RecordDecision) -> StoreResult<ApprovalStep> {
        self.check_pending(input)?;
        let step = self
            .steps
            .get_mut(&input.chain_id)
            .and_then(|steps| steps.iter_mut().find(|s| s.position == input.position))
            .ok_or(CoreError::NotFound {
                entity: "approval chain",
                id: input.chain_id,
            })?;
        step.decision = input.decision;
        step.decided_by = Some(input.decided_by);
        step.notes = input.notes.clone();
        step.decided_at = Some(Utc::now());
        Ok(step.clone())
    }

    fn insert_chain(&mut self, input: &NewChain) -> ChainWithSteps {
        let chain_id = self.id();
        let chain = ApprovalChain {
            id: chain_id,
            entity_type: input.entity_type,
            entity_id: input.entity_id,
            status: ChainStatus::InFlight,
            created_by: input.created_by,
            created_at: Utc::now(),
            closed_at: None,
        };
        let mut steps = Vec::with_capacity(input.steps.len());
        for (idx, role) in input.steps.iter().enumerate() {
            let step_id = self.id();
            steps.push(ApprovalStep {
                id: step_id,
                chain_id,
                position: idx as i32 + 1,
                role: *role,
                decision: StepDecision::Pending,
                decided_by: None,
                notes: None,
                decided_at: None,
            });
        }
        self.chains.insert(chain_id, chain.clone());
        self.steps.insert(chain_id, steps.clone());
        ChainWithSteps { chain, steps }
    }
}

/// Read a row that a compare-and-swap is about to write, failing the same
/// way the write would.
fn current<'a, T>(
    map: &'a BTreeMap<DbId, T>,
    entity: &'static str,
    id: DbId,
    expected: i32,
    version: impl Fn(&T) -> i32,
) -> StoreResult<&'a T> {
    let row = map.get(&id).ok_or(CoreError::NotFound { entity, id })?;
    if version(row) != expected {
        return Err(CoreError::StaleState {
            entity,
            id,
            expected,
        });
    }
    Ok(row)
}

/// Fetch a versioned row for a compare-and-swap write.
fn versioned<'a, T>(
    map: &'a mut BTreeMap<DbId, T>,
    entity: &'static str,
    id: DbId,
    expected: i32,
    version: impl Fn(&T) -> i32,
) -> StoreResult<&'a mut T> {
    current(map, entity, id, expected, &version)?;
    map.get_mut(&id).ok_or(CoreError::NotFound { entity, id })
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    // ── Users and teams ──

    async fn create_user(&self, input: &CreateUser) -> StoreResult<User> {
        let mut t = self.tables.lock().await;
        if t.users.values().any(|u| u.email == input.email) {
            return Err(CoreError::Conflict(format!(
                "A user with email '{}' already exists",
                input.email
            )));
        }
        let id = t.id();
        let user = User {
            id,
            name: input.name.clone(),
            email: input.email.clone(),
            role: input.role,
            created_at: Utc::now(),
        };
        t.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: DbId) -> StoreResult<User> {
        let t = self.tables.lock().await;
        t.require_user(id).cloned()
    }

    async fn list_users_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.values().filter(|u| u.role == role).cloned().collect())
    }

    async fn add_team_member(&self, project_id: DbId, user_id: DbId) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        t.require_project(project_id)?;
        t.require_user(user_id)?;
        t.team.insert((project_id, user_id));
        Ok(())
    }

    async fn is_team_member(&self, project_id: DbId, user_id: DbId) -> StoreResult<bool> {
        let t = self.tables.lock().await;
        Ok(t.team.contains(&(project_id, user_id)))
    }

    async fn list_team_members(&self, project_id: DbId) -> StoreResult<Vec<User>> {
        let t = self.tables.lock().await;
        Ok(t.team
            .iter()
            .filter(|(p, _)| *p == project_id)
            .filter_map(|(_, u)| t.users.get(u).cloned())
            .collect())
    }

    // ── Projects ──

    async fn create_project(&self, input: &CreateProject) -> StoreResult<Project> {
        let mut t = self.tables.lock().await;
        t.require_user(input.client_id)?;
        let id = t.id();
        let now = Utc::now();
        let project = Project {
            id,
            name: input.name.clone(),
            address: input.address.clone(),
            city: input.city.clone(),
            application_type: input.application_type,
            client_id: input.client_id,
            project_lead_id: input.project_lead_id,
            admin_lead_id: input.admin_lead_id,
            status: ProjectStatus::Draft,
            rejected_from: None,
            rejection_notes: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        t.projects.insert(id, project.clone());
        Ok(project)
    }

    async fn get_project(&self, id: DbId) -> StoreResult<Project> {
        let t = self.tables.lock().await;
        t.require_project(id).cloned()
    }

    async fn list_projects(
        &self,
        filter: &ProjectFilter,
        scope: ProjectScope,
    ) -> StoreResult<Vec<Project>> {
        let t = self.tables.lock().await;
        let member_of = |project_id: DbId| match scope {
            ProjectScope::Led(user) | ProjectScope::TeamMember(user) => {
                t.team.contains(&(project_id, user))
            }
            _ => false,
        };
        Ok(t.projects
            .values()
            .rev()
            .filter(|p| filter.matches(p))
            .filter(|p| can_view(scope, p.client_id, p.project_lead_id, member_of(p.id)))
            .cloned()
            .collect())
    }

    async fn apply_project_transition(
        &self,
        id: DbId,
        expected_version: i32,
        change: &ProjectTransition,
    ) -> StoreResult<Project> {
        let mut t = self.tables.lock().await;
        let project = t.transition_project(id, expected_version, change)?;
        if let Some(chain_id) = t.in_flight_chain(EntityKind::Project, id).map(|c| c.id) {
            t.close_chain(chain_id, ChainStatus::Abandoned);
        }
        Ok(project)
    }

    // ── Documents ──

    async fn create_document(&self, input: &CreateDocument) -> StoreResult<Document> {
        let mut t = self.tables.lock().await;
        if let Some(project_id) = input.project_id {
            t.require_project(project_id)?;
            if t.documents
                .values()
                .any(|d| d.project_id == Some(project_id) && d.category == input.category)
            {
                return Err(CoreError::Conflict(format!(
                    "Project {project_id} already has a '{}' document",
                    input.category
                )));
            }
        }
        let id = t.id();
        let now = Utc::now();
        let doc = Document {
            id,
            project_id: input.project_id,
            category: input.category.clone(),
            uploaded_by: input.uploaded_by,
            status: DocumentStatus::Uploaded,
            file_ref: Some(input.file.file_ref.clone()),
            file_name: Some(input.file.file_name.clone()),
            file_format: Some(input.file.file_format.clone()),
            file_size_bytes: Some(input.file.file_size_bytes),
            revision: 0,
            revision_notes: None,
            verified_by: None,
            verified_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        t.documents.insert(id, doc.clone());
        Ok(doc)
    }

    async fn get_document(&self, id: DbId) -> StoreResult<Document> {
        let t = self.tables.lock().await;
        t.documents
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound { entity: "document", id })
    }

    async fn find_document(
        &self,
        project_id: DbId,
        category: &str,
    ) -> StoreResult<Option<Document>> {
        let t = self.tables.lock().await;
        Ok(t.documents
            .values()
            .find(|d| d.project_id == Some(project_id) && d.category == category)
            .cloned())
    }

    async fn list_documents(&self, project_id: DbId) -> StoreResult<Vec<Document>> {
        let t = self.tables.lock().await;
        Ok(t.documents
            .values()
            .filter(|d| d.project_id == Some(project_id))
            .cloned()
            .collect())
    }

    async fn update_document(
        &self,
        id: DbId,
        expected_version: i32,
        change: &DocumentChange,
    ) -> StoreResult<Document> {
        if change.status == DocumentStatus::Rejected
            && change.revision_notes.as_deref().map_or(true, |n| n.trim().is_empty())
        {
            return Err(CoreError::Validation(
                "Value violates ck_documents_rejection_notes".to_string(),
            ));
        }
        let mut t = self.tables.lock().await;
        let doc = versioned(&mut t.documents, "document", id, expected_version, |d| d.version)?;
        doc.status = change.status;
        doc.uploaded_by = change.uploaded_by;
        doc.file_ref = change.file_ref.clone();
        doc.file_name = change.file_name.clone();
        doc.file_format = change.file_format.clone();
        doc.file_size_bytes = change.file_size_bytes;
        doc.revision = change.revision;
        doc.revision_notes = change.revision_notes.clone();
        doc.verified_by = change.verified_by;
        doc.verified_at = change.verified_at;
        doc.version += 1;
        doc.updated_at = Utc::now();
        Ok(doc.clone())
    }

    // ── Schedules ──

    async fn create_schedule(&self, input: &CreateSchedule) -> StoreResult<Schedule> {
        let mut t = self.tables.lock().await;
        t.require_project(input.project_id)?;
        let id = t.id();
        let now = Utc::now();
        let schedule = Schedule {
            id,
            project_id: input.project_id,
            schedule_type: input.schedule_type,
            scheduled_date: input.scheduled_date,
            assigned_to: None,
            status: ScheduleStatus::Scheduled,
            started_at: None,
            ended_at: None,
            notes: input.notes.clone(),
            created_by: input.created_by,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        t.schedules.insert(id, schedule.clone());
        Ok(schedule)
    }

    async fn get_schedule(&self, id: DbId) -> StoreResult<Schedule> {
        let t = self.tables.lock().await;
        t.schedules
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound { entity: "schedule", id })
    }

    async fn list_schedules(&self, project_id: DbId) -> StoreResult<Vec<Schedule>> {
        let t = self.tables.lock().await;
        let mut schedules: Vec<Schedule> = t
            .schedules
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        schedules.sort_by_key(|s| (s.scheduled_date, s.id));
        Ok(schedules)
    }

    async fn list_active_schedules_for(&self, user_id: DbId) -> StoreResult<Vec<Schedule>> {
        let t = self.tables.lock().await;
        Ok(t.schedules
            .values()
            .filter(|s| s.assigned_to == Some(user_id) && s.status == ScheduleStatus::InProgress)
            .cloned()
            .collect())
    }

    async fn set_schedule_assignee(
        &self,
        id: DbId,
        expected_version: i32,
        user_id: DbId,
    ) -> StoreResult<Schedule> {
        let mut t = self.tables.lock().await;
        t.require_user(user_id)?;
        let schedule = versioned(&mut t.schedules, "schedule", id, expected_version, |s| s.version)?;
        schedule.assigned_to = Some(user_id);
        schedule.version += 1;
        schedule.updated_at = Utc::now();
        Ok(schedule.clone())
    }

    async fn start_inspection(
        &self,
        id: DbId,
        expected_version: i32,
        location: &NewInspectionLocation,
        audit: &NewTransition,
    ) -> StoreResult<Schedule> {
        let mut t = self.tables.lock().await;

        let assignee = current(&t.schedules, "schedule", id, expected_version, |s| s.version)?
            .assigned_to;
        let busy = t.schedules.values().any(|s| {
            s.id != id && s.assigned_to.is_some() && s.assigned_to == assignee
                && s.status == ScheduleStatus::InProgress
        });
        if busy {
            return Err(CoreError::Conflict(format!(
                "User {} already has an inspection in progress",
                location.captured_by
            )));
        }
        if t.locations.contains_key(&id) {
            return Err(CoreError::Conflict(format!(
                "Schedule {id} already has a recorded location"
            )));
        }

        let now = Utc::now();
        let schedule = versioned(&mut t.schedules, "schedule", id, expected_version, |s| s.version)?;
        schedule.status = ScheduleStatus::InProgress;
        schedule.started_at = Some(now);
        schedule.version += 1;
        schedule.updated_at = now;
        let schedule = schedule.clone();

        let location_id = t.id();
        t.locations.insert(
            id,
            InspectionLocation {
                id: location_id,
                schedule_id: id,
                kind: location.kind,
                latitude: location.latitude,
                longitude: location.longitude,
                accuracy_m: location.accuracy_m,
                note: location.note.clone(),
                gps_failure: location.gps_failure,
                captured_by: location.captured_by,
                captured_at: now,
            },
        );
        t.record(audit);
        Ok(schedule)
    }

    async fn apply_schedule_transition(
        &self,
        id: DbId,
        expected_version: i32,
        change: &ScheduleTransition,
    ) -> StoreResult<Schedule> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let schedule = versioned(&mut t.schedules, "schedule", id, expected_version, |s| s.version)?;
        schedule.status = change.to;
        if matches!(change.to, ScheduleStatus::Completed | ScheduleStatus::Cancelled) {
            schedule.ended_at = Some(now);
        }
        schedule.version += 1;
        schedule.updated_at = now;
        let schedule = schedule.clone();
        t.record(&change.audit);
        Ok(schedule)
    }

    async fn get_inspection_location(
        &self,
        schedule_id: DbId,
    ) -> StoreResult<Option<InspectionLocation>> {
        let t = self.tables.lock().await;
        Ok(t.locations.get(&schedule_id).cloned())
    }

    // ── Checklists ──

    async fn create_checklist_item(
        &self,
        input: &CreateChecklistItem,
    ) -> StoreResult<ChecklistItem> {
        let mut t = self.tables.lock().await;
        if t.checklist_items.values().any(|i| i.code == input.code) {
            return Err(CoreError::Conflict(format!(
                "Checklist item code '{}' already exists",
                input.code
            )));
        }
        let id = t.id();
        let item = ChecklistItem {
            id,
            code: input.code.clone(),
            category: input.category.clone(),
            label: input.label.clone(),
            response_kind: input.response_kind,
            options: input.options.clone(),
            min_value: input.min_value,
            max_value: input.max_value,
            is_required: input.is_required,
            created_at: Utc::now(),
        };
        t.checklist_items.insert(id, item.clone());
        Ok(item)
    }

    async fn get_checklist_item(&self, id: DbId) -> StoreResult<ChecklistItem> {
        let t = self.tables.lock().await;
        t.checklist_items
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound { entity: "checklist item", id })
    }

    async fn list_checklist_items(&self) -> StoreResult<Vec<ChecklistItem>> {
        let t = self.tables.lock().await;
        let mut items: Vec<ChecklistItem> = t.checklist_items.values().cloned().collect();
        items.sort_by(|a, b| a.category.cmp(&b.category).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn upsert_checklist_response(
        &self,
        input: &UpsertChecklistResponse,
    ) -> StoreResult<ChecklistResponse> {
        let mut t = self.tables.lock().await;
        let key = (input.schedule_id, input.item_id, input.responder_id);
        let now = Utc::now();

        if let Some(existing) = t.checklist_responses.get_mut(&key) {
            existing.payload = input.payload.clone();
            existing.status = input.status;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let id = t.id();
        let response = ChecklistResponse {
            id,
            schedule_id: input.schedule_id,
            item_id: input.item_id,
            responder_id: input.responder_id,
            payload: input.payload.clone(),
            status: input.status,
            created_at: now,
            updated_at: now,
        };
        t.checklist_responses.insert(key, response.clone());
        Ok(response)
    }

    async fn list_checklist_responses(
        &self,
        schedule_id: DbId,
    ) -> StoreResult<Vec<ChecklistResponse>> {
        let t = self.tables.lock().await;
        Ok(t.checklist_responses
            .values()
            .filter(|r| r.schedule_id == schedule_id)
            .cloned()
            .collect())
    }

    // ── Reports ──

    async fn create_report(&self, input: &CreateReport) -> StoreResult<Report> {
        let mut t = self.tables.lock().await;
        t.require_project(input.project_id)?;
        let id = t.id();
        let now = Utc::now();
        let report = Report {
            id,
            project_id: input.project_id,
            schedule_id: input.schedule_id,
            author_id: input.author_id,
            status: ReportStatus::Draft,
            findings: Vec::new(),
            file_ref: input.file_ref.clone(),
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        t.reports.insert(id, report.clone());
        Ok(report)
    }

    async fn get_report(&self, id: DbId) -> StoreResult<Report> {
        let t = self.tables.lock().await;
        t.reports
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound { entity: "report", id })
    }

    async fn list_reports(&self, project_id: DbId) -> StoreResult<Vec<Report>> {
        let t = self.tables.lock().await;
        Ok(t.reports
            .values()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn apply_report_transition(
        &self,
        id: DbId,
        expected_version: i32,
        change: &ReportTransition,
    ) -> StoreResult<Report> {
        let mut t = self.tables.lock().await;
        t.transition_report(id, expected_version, change)
    }

    async fn set_report_findings(
        &self,
        id: DbId,
        expected_version: i32,
        findings: &[DbId],
    ) -> StoreResult<Report> {
        let mut t = self.tables.lock().await;
        let report = versioned(&mut t.reports, "report", id, expected_version, |r| r.version)?;
        report.findings = findings.to_vec();
        report.version += 1;
        report.updated_at = Utc::now();
        Ok(report.clone())
    }

    // ── Approval chains ──

    async fn open_review(
        &self,
        input: &OpenReview,
    ) -> StoreResult<(ChainWithSteps, ReviewedEntity)> {
        let mut t = self.tables.lock().await;
        let target = &input.chain;
        t.check_subject(target.entity_id, input.expected_version, &input.change)?;
        if t.in_flight_chain(target.entity_type, target.entity_id).is_some() {
            return Err(CoreError::ChainInProgress {
                entity: target.entity_type.as_str(),
                id: target.entity_id,
            });
        }

        let entity = t.apply_subject(target.entity_id, input.expected_version, &input.change)?;
        let chain = t.insert_chain(target);
        Ok((chain, entity))
    }

    async fn get_active_chain(
        &self,
        entity_type: EntityKind,
        entity_id: DbId,
    ) -> StoreResult<Option<ChainWithSteps>> {
        let t = self.tables.lock().await;
        Ok(t.in_flight_chain(entity_type, entity_id)
            .map(|c| t.chain_with_steps(c)))
    }

    async fn list_chains(
        &self,
        entity_type: EntityKind,
        entity_id: DbId,
    ) -> StoreResult<Vec<ChainWithSteps>> {
        let t = self.tables.lock().await;
        Ok(t.chains
            .values()
            .filter(|c| c.entity_type == entity_type && c.entity_id == entity_id)
            .map(|c| t.chain_with_steps(c))
            .collect())
    }

    async fn record_step_decision(&self, input: &RecordDecision) -> StoreResult<ApprovalStep> {
        let mut t = self.tables.lock().await;
        t.decide_step(input)
    }

    async fn close_review(
        &self,
        input: &CloseReview,
    ) -> StoreResult<(ApprovalStep, ReviewedEntity)> {
        let mut t = self.tables.lock().await;
        t.check_pending(&input.decision)?;
        t.check_subject(input.entity_id, input.expected_version, &input.change)?;

        let step = t.decide_step(&input.decision)?;
        t.close_chain(input.decision.chain_id, input.close_as);
        let entity = t.apply_subject(input.entity_id, input.expected_version, &input.change)?;
        Ok((step, entity))
    }

    // ── Notifications ──

    async fn create_notification(&self, input: &NewNotification) -> StoreResult<Notification> {
        let mut t = self.tables.lock().await;
        t.require_user(input.recipient_id)?;
        let id = t.id();
        let notification = Notification {
            id,
            recipient_id: input.recipient_id,
            sender_id: input.sender_id,
            kind: input.kind.clone(),
            message: input.message.clone(),
            entity_type: input.entity_type,
            entity_id: input.entity_id,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        };
        t.notifications.insert(id, notification.clone());
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        recipient_id: DbId,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        let t = self.tables.lock().await;
        Ok(t.notifications
            .values()
            .rev()
            .filter(|n| n.recipient_id == recipient_id && (!unread_only || !n.is_read))
            .cloned()
            .collect())
    }

    async fn mark_notification_read(&self, id: DbId, recipient_id: DbId) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        match t.notifications.get_mut(&id) {
            Some(n) if n.recipient_id == recipient_id && !n.is_read => {
                n.is_read = true;
                n.read_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn unread_count(&self, recipient_id: DbId) -> StoreResult<i64> {
        let t = self.tables.lock().await;
        Ok(t.notifications
            .values()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
            .count() as i64)
    }

    // ── Audit ──

    async fn list_transitions(
        &self,
        entity_type: EntityKind,
        entity_id: DbId,
    ) -> StoreResult<Vec<StatusTransition>> {
        let t = self.tables.lock().await;
        Ok(t.transitions
            .iter()
            .filter(|r| r.entity_type == entity_type && r.entity_id == entity_id)
            .cloned()
            .collect())
    }
}
