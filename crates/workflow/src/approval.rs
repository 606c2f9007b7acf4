//! Sequenced multi-party review of reports and projects.
//!
//! Opening a review moves the entity into its review state and opens an
//! approval chain with one pending step per reviewer role, in one write.
//! Decisions are taken strictly in order. The first rejection closes the
//! chain and sends the entity back; the last approval closes it and
//! approves the entity. Closing the chain and moving the entity are one
//! write as well. Decided steps are never rewritten.
//!
//! Reports enter review on `under_review`. Projects enter review on the
//! chain-gated states of the project graph.

use serde::Serialize;
use slf_core::approval::{self, ChainDefinition, ChainOutcome, Decision};
use slf_core::error::CoreError;
use slf_core::roles::Role;
use slf_core::status::{ChainStatus, EntityKind, ProjectStatus, ReportStatus};
use slf_core::types::{Actor, DbId};
use slf_core::workflow;
use slf_db::models::approval::{
    ChainWithSteps, CloseReview, NewChain, OpenReview, RecordDecision, ReviewedEntity,
    SubjectChange,
};
use slf_db::models::project::{Project, ProjectTransition};
use slf_db::models::report::{Report, ReportTransition, ReviewStamp};
use slf_db::models::transition::NewTransition;
use slf_events::{kinds, Recipient, WorkflowEvent};

use crate::context::{check_version, clean_notes, Context};
use crate::engine::notify_project_change;

/// A report together with the chain reviewing it.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewState {
    pub report: Report,
    pub chain: ChainWithSteps,
}

/// A project together with the chain reviewing it.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectReview {
    pub project: Project,
    pub chain: ChainWithSteps,
}

/// Result of one recorded decision on a report.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionResult {
    pub report: Report,
    pub chain: ChainWithSteps,
    pub outcome: ChainOutcome,
}

/// Result of one recorded decision on a project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDecisionResult {
    pub project: Project,
    pub chain: ChainWithSteps,
    pub outcome: ChainOutcome,
}

/// An entity that can be put through an approval chain.
trait Reviewable: Sized {
    const KIND: EntityKind;
    const NOUN: &'static str;

    fn id(&self) -> DbId;
    fn version(&self) -> i32;
    fn status_label(&self) -> String;
    fn under_review(&self) -> bool;

    /// The transition applied when the chain closes.
    fn closing_change(
        &self,
        approved: bool,
        actor: Actor,
        notes: Option<String>,
    ) -> Result<SubjectChange, CoreError>;

    fn from_reviewed(entity: ReviewedEntity) -> Result<Self, CoreError>;
}

impl Reviewable for Report {
    const KIND: EntityKind = EntityKind::Report;
    const NOUN: &'static str = "Report";

    fn id(&self) -> DbId {
        self.id
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn status_label(&self) -> String {
        self.status.to_string()
    }

    fn under_review(&self) -> bool {
        self.status == ReportStatus::UnderReview
    }

    fn closing_change(
        &self,
        approved: bool,
        actor: Actor,
        notes: Option<String>,
    ) -> Result<SubjectChange, CoreError> {
        let target = if approved {
            ReportStatus::Approved
        } else {
            ReportStatus::Rejected
        };
        let edge = workflow::report::decision_edge(self.status, target)?;
        workflow::require_payload(&edge, notes.as_deref())?;
        Ok(SubjectChange::Report(ReportTransition {
            to: edge.to,
            review: Some(ReviewStamp {
                reviewed_by: actor.user_id,
                review_notes: notes.clone(),
            }),
            audit: NewTransition::new(EntityKind::Report, self.id, self.status, edge.to, actor, notes),
        }))
    }

    fn from_reviewed(entity: ReviewedEntity) -> Result<Self, CoreError> {
        match entity {
            ReviewedEntity::Report(report) => Ok(report),
            ReviewedEntity::Project(p) => Err(CoreError::Internal(format!(
                "Review write returned project {} for a report",
                p.id
            ))),
        }
    }
}

impl Reviewable for Project {
    const KIND: EntityKind = EntityKind::Project;
    const NOUN: &'static str = "Project";

    fn id(&self) -> DbId {
        self.id
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn status_label(&self) -> String {
        self.status.to_string()
    }

    fn under_review(&self) -> bool {
        workflow::project::opens_chain(self.status)
    }

    fn closing_change(
        &self,
        approved: bool,
        actor: Actor,
        notes: Option<String>,
    ) -> Result<SubjectChange, CoreError> {
        let target = if approved {
            ProjectStatus::ApprovedByAdminLead
        } else {
            ProjectStatus::Rejected
        };
        let edge = workflow::project::decision_edge(self.status, target)?;
        workflow::require_payload(&edge, notes.as_deref())?;
        let (rejected_from, rejection_notes) = if approved {
            (self.rejected_from, self.rejection_notes.clone())
        } else {
            (Some(self.status), notes.clone())
        };
        Ok(SubjectChange::Project(ProjectTransition {
            to: edge.to,
            rejected_from,
            rejection_notes,
            audit: NewTransition::new(
                EntityKind::Project,
                self.id,
                self.status,
                edge.to,
                actor,
                notes,
            ),
        }))
    }

    fn from_reviewed(entity: ReviewedEntity) -> Result<Self, CoreError> {
        match entity {
            ReviewedEntity::Project(project) => Ok(project),
            ReviewedEntity::Report(r) => Err(CoreError::Internal(format!(
                "Review write returned report {} for a project",
                r.id
            ))),
        }
    }
}

/// One decision applied to a chain.
struct Decided<T> {
    subject: T,
    chain: ChainWithSteps,
    outcome: ChainOutcome,
    notes: Option<String>,
}

#[derive(Clone)]
pub struct ApprovalCoordinator {
    ctx: Context,
}

impl ApprovalCoordinator {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    // ── Reports ──

    /// Move a submitted report to `under_review` and open its chain.
    ///
    /// `chain` overrides the configured default. A report that already has
    /// a chain in flight is refused with `ChainInProgress`; the running
    /// chain is never reconfigured.
    pub async fn submit_for_review(
        &self,
        report_id: DbId,
        chain: Option<ChainDefinition>,
        actor: Actor,
        expected_version: Option<i32>,
    ) -> Result<ReviewState, CoreError> {
        let store = self.ctx.store();
        let report = self.ctx.retry(move || store.get_report(report_id)).await?;
        self.ctx.visible_project(report.project_id, &actor).await?;
        self.refuse_second_chain::<Report>(report_id).await?;

        let expected = check_version("report", report_id, report.version, expected_version)?;
        let edge = workflow::report::check(
            report.status,
            ReportStatus::UnderReview,
            actor.role,
            None,
        )?;

        let definition = chain.unwrap_or_else(|| self.ctx.settings.approval_chain.clone());
        let change = SubjectChange::Report(ReportTransition {
            to: edge.to,
            review: None,
            audit: NewTransition::new(
                EntityKind::Report,
                report_id,
                report.status,
                edge.to,
                actor,
                None,
            ),
        });
        let (chain, report) = self
            .open::<Report>(report_id, expected, &definition, change, actor)
            .await?;
        Ok(ReviewState { report, chain })
    }

    /// Record `decision` on the next pending step of a report's chain.
    ///
    /// `role` is the role the caller signs as and must match the caller's
    /// own role.
    pub async fn record_decision(
        &self,
        report_id: DbId,
        role: Role,
        decision: Decision,
        notes: Option<&str>,
        actor: Actor,
    ) -> Result<DecisionResult, CoreError> {
        check_signing_role(role, actor)?;
        let store = self.ctx.store();
        let report = self.ctx.retry(move || store.get_report(report_id)).await?;
        let project = self.ctx.visible_project(report.project_id, &actor).await?;

        let decided = self.decide(report, role, decision, notes, actor).await?;
        let report = decided.subject;

        if !matches!(decided.outcome, ChainOutcome::Advanced { .. }) {
            let (kind, message) = if decided.outcome == ChainOutcome::Approved {
                (
                    kinds::REPORT_APPROVED,
                    format!("Report {report_id} for '{}' was approved", project.name),
                )
            } else {
                (
                    kinds::REPORT_REJECTED,
                    format!(
                        "Report {report_id} for '{}' was returned by {role}: {}",
                        project.name,
                        decided.notes.as_deref().unwrap_or_default()
                    ),
                )
            };
            let event = WorkflowEvent::new(kind, EntityKind::Report, report_id, message)
                .by(actor)
                .to(Recipient::User(report.author_id))
                .to_user(project.project_lead_id);
            self.ctx.notify(event).await;
        }

        Ok(DecisionResult {
            report,
            chain: decided.chain,
            outcome: decided.outcome,
        })
    }

    /// Every chain a report has been through, oldest first.
    pub async fn list_chains(
        &self,
        report_id: DbId,
        actor: &Actor,
    ) -> Result<Vec<ChainWithSteps>, CoreError> {
        let store = self.ctx.store();
        let report = self.ctx.retry(move || store.get_report(report_id)).await?;
        self.ctx.visible_project(report.project_id, actor).await?;
        self.ctx
            .retry(move || store.list_chains(EntityKind::Report, report_id))
            .await
    }

    // ── Projects ──

    /// Apply an already validated move into a chain-gated state and open the
    /// project's chain with it.
    pub(crate) async fn open_project_review(
        &self,
        project: &Project,
        change: ProjectTransition,
        expected_version: i32,
        actor: Actor,
    ) -> Result<ProjectReview, CoreError> {
        self.refuse_second_chain::<Project>(project.id).await?;
        let definition = self.ctx.settings.project_approval_chain.clone();
        let (chain, project) = self
            .open::<Project>(
                project.id,
                expected_version,
                &definition,
                SubjectChange::Project(change),
                actor,
            )
            .await?;
        Ok(ProjectReview { project, chain })
    }

    /// Record `decision` on the next pending step of a project's chain.
    ///
    /// The last approval moves the project to `approved_by_admin_lead`; a
    /// rejection sends it back to its producer through `rejected`.
    pub async fn record_project_decision(
        &self,
        project_id: DbId,
        role: Role,
        decision: Decision,
        notes: Option<&str>,
        actor: Actor,
    ) -> Result<ProjectDecisionResult, CoreError> {
        check_signing_role(role, actor)?;
        let project = self.ctx.visible_project(project_id, &actor).await?;
        let from = project.status;

        let decided = self.decide(project, role, decision, notes, actor).await?;
        if !matches!(decided.outcome, ChainOutcome::Advanced { .. }) {
            notify_project_change(&self.ctx, &decided.subject, from, actor, decided.notes).await;
        }

        Ok(ProjectDecisionResult {
            project: decided.subject,
            chain: decided.chain,
            outcome: decided.outcome,
        })
    }

    /// Every chain a project has been through, oldest first.
    pub async fn list_project_chains(
        &self,
        project_id: DbId,
        actor: &Actor,
    ) -> Result<Vec<ChainWithSteps>, CoreError> {
        self.ctx.visible_project(project_id, actor).await?;
        let store = self.ctx.store();
        self.ctx
            .retry(move || store.list_chains(EntityKind::Project, project_id))
            .await
    }

    // ── Shared ──

    async fn refuse_second_chain<T: Reviewable>(&self, id: DbId) -> Result<(), CoreError> {
        let store = self.ctx.store();
        let active = self
            .ctx
            .retry(move || store.get_active_chain(T::KIND, id))
            .await?;
        match active {
            Some(_) => Err(CoreError::ChainInProgress {
                entity: T::KIND.as_str(),
                id,
            }),
            None => Ok(()),
        }
    }

    async fn open<T: Reviewable>(
        &self,
        id: DbId,
        expected_version: i32,
        definition: &ChainDefinition,
        change: SubjectChange,
        actor: Actor,
    ) -> Result<(ChainWithSteps, T), CoreError> {
        let input = OpenReview {
            chain: NewChain {
                entity_type: T::KIND,
                entity_id: id,
                created_by: actor.user_id,
                steps: definition.steps().to_vec(),
            },
            expected_version,
            change,
        };
        let store = self.ctx.store();
        let input = &input;
        let (chain, entity) = self.ctx.retry(move || store.open_review(input)).await?;
        let subject = T::from_reviewed(entity)?;

        tracing::info!(
            entity = T::KIND.as_str(),
            entity_id = id,
            chain_id = chain.chain.id,
            steps = definition.len(),
            actor_id = actor.user_id,
            "Review opened"
        );

        if let Some(first) = definition.steps().first() {
            self.notify_step_pending::<T>(id, *first, 1, actor).await;
        }
        Ok((chain, subject))
    }

    async fn decide<T: Reviewable>(
        &self,
        subject: T,
        role: Role,
        decision: Decision,
        notes: Option<&str>,
        actor: Actor,
    ) -> Result<Decided<T>, CoreError> {
        let id = subject.id();
        if !subject.under_review() {
            return Err(CoreError::IllegalTransition {
                entity: T::KIND.as_str(),
                from: subject.status_label(),
                to: decision.to_string(),
            });
        }

        let store = self.ctx.store();
        let chain = self
            .ctx
            .retry(move || store.get_active_chain(T::KIND, id))
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!("{} {id} has no approval chain in flight", T::NOUN))
            })?;
        let chain_id = chain.chain.id;

        let steps = chain.decisions();
        let position = approval::check_decision(&steps, role, decision, notes)?;
        let outcome = approval::outcome(&steps, position, decision);
        let notes = clean_notes(notes);

        let step = RecordDecision {
            chain_id,
            position,
            decision: decision.into(),
            decided_by: actor.user_id,
            notes: notes.clone(),
        };

        let subject = match outcome {
            ChainOutcome::Advanced { .. } => {
                let step = &step;
                self.ctx
                    .retry(move || store.record_step_decision(step))
                    .await?;
                subject
            }
            ChainOutcome::Approved | ChainOutcome::Rejected => {
                let approved = outcome == ChainOutcome::Approved;
                let input = CloseReview {
                    change: subject.closing_change(approved, actor, notes.clone())?,
                    decision: step,
                    close_as: if approved {
                        ChainStatus::Approved
                    } else {
                        ChainStatus::Rejected
                    },
                    entity_id: id,
                    expected_version: subject.version(),
                };
                let input = &input;
                let (_, entity) = self.ctx.retry(move || store.close_review(input)).await?;
                T::from_reviewed(entity)?
            }
        };

        tracing::info!(
            entity = T::KIND.as_str(),
            entity_id = id,
            chain_id,
            position,
            role = %role,
            decision = %decision,
            actor_id = actor.user_id,
            "Approval step decided"
        );

        match outcome {
            ChainOutcome::Advanced {
                next_position,
                next_role,
            } => {
                self.notify_step_pending::<T>(id, next_role, next_position, actor)
                    .await;
            }
            ChainOutcome::Approved | ChainOutcome::Rejected => {
                tracing::info!(
                    entity = T::KIND.as_str(),
                    entity_id = id,
                    chain_id,
                    status = %subject.status_label(),
                    "Approval chain closed"
                );
            }
        }

        let chain = self.find_chain(T::KIND, id, chain_id).await?;
        Ok(Decided {
            subject,
            chain,
            outcome,
            notes,
        })
    }

    async fn find_chain(
        &self,
        kind: EntityKind,
        id: DbId,
        chain_id: DbId,
    ) -> Result<ChainWithSteps, CoreError> {
        let store = self.ctx.store();
        self.ctx
            .retry(move || store.list_chains(kind, id))
            .await?
            .into_iter()
            .find(|c| c.chain.id == chain_id)
            .ok_or(CoreError::NotFound {
                entity: "approval chain",
                id: chain_id,
            })
    }

    async fn notify_step_pending<T: Reviewable>(
        &self,
        id: DbId,
        role: Role,
        position: i32,
        actor: Actor,
    ) {
        let event = WorkflowEvent::new(
            kinds::REVIEW_STEP_PENDING,
            T::KIND,
            id,
            format!("{} {id} awaits your review (step {position})", T::NOUN),
        )
        .by(actor)
        .to(Recipient::Role(role))
        .with_payload(serde_json::json!({ "position": position, "role": role }));
        self.ctx.notify(event).await;
    }
}

fn check_signing_role(role: Role, actor: Actor) -> Result<(), CoreError> {
    if role != actor.role {
        return Err(CoreError::Forbidden(format!(
            "Cannot sign as '{role}' while holding '{}'",
            actor.role
        )));
    }
    Ok(())
}
