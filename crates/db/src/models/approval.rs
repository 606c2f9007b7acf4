//! Approval chain and step models.

use serde::Serialize;
use slf_core::roles::Role;
use slf_core::status::{ChainStatus, EntityKind, StepDecision};
use slf_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use crate::models::project::{Project, ProjectTransition};
use crate::models::report::{Report, ReportTransition};

/// A row from the `approval_chains` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApprovalChain {
    pub id: DbId,
    #[sqlx(try_from = "String")]
    pub entity_type: EntityKind,
    pub entity_id: DbId,
    #[sqlx(try_from = "String")]
    pub status: ChainStatus,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub closed_at: Option<Timestamp>,
}

/// A row from the `approval_steps` table. Never deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApprovalStep {
    pub id: DbId,
    pub chain_id: DbId,
    /// 1-based order within the chain.
    pub position: i32,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[sqlx(try_from = "String")]
    pub decision: StepDecision,
    pub decided_by: Option<DbId>,
    pub notes: Option<String>,
    pub decided_at: Option<Timestamp>,
}

/// A chain together with its ordered steps.
#[derive(Debug, Clone, Serialize)]
pub struct ChainWithSteps {
    #[serde(flatten)]
    pub chain: ApprovalChain,
    pub steps: Vec<ApprovalStep>,
}

impl ChainWithSteps {
    /// `(role, decision)` pairs in position order.
    pub fn decisions(&self) -> Vec<(Role, StepDecision)> {
        self.steps.iter().map(|s| (s.role, s.decision)).collect()
    }
}

/// Input for opening a chain.
#[derive(Debug, Clone)]
pub struct NewChain {
    pub entity_type: EntityKind,
    pub entity_id: DbId,
    pub created_by: DbId,
    pub steps: Vec<Role>,
}

/// One decision on a pending step.
#[derive(Debug, Clone)]
pub struct RecordDecision {
    pub chain_id: DbId,
    pub position: i32,
    pub decision: StepDecision,
    pub decided_by: DbId,
    pub notes: Option<String>,
}

/// Status change of the entity a chain reviews.
#[derive(Debug, Clone)]
pub enum SubjectChange {
    Project(ProjectTransition),
    Report(ReportTransition),
}

impl SubjectChange {
    pub fn kind(&self) -> EntityKind {
        match self {
            SubjectChange::Project(_) => EntityKind::Project,
            SubjectChange::Report(_) => EntityKind::Report,
        }
    }
}

/// The entity a chain reviews, as stored after a review write.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReviewedEntity {
    Project(Project),
    Report(Report),
}

/// Open a chain and move its entity into review in one write.
#[derive(Debug, Clone)]
pub struct OpenReview {
    pub chain: NewChain,
    pub expected_version: i32,
    pub change: SubjectChange,
}

/// Decide the last step of a chain, close the chain and move its entity
/// out of review in one write.
#[derive(Debug, Clone)]
pub struct CloseReview {
    pub decision: RecordDecision,
    pub close_as: ChainStatus,
    pub entity_id: DbId,
    pub expected_version: i32,
    pub change: SubjectChange,
}
