//! Transition graphs for projects, reports and schedules.
//!
//! Each graph is the single authority on which status changes exist, which
//! roles may perform them and which payload an edge demands. The workflow
//! services consult these tables before every write.

use std::fmt::Display;

use crate::error::CoreError;
use crate::roles::Role;
use crate::status::{ProjectStatus, ReportStatus, ScheduleStatus};

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// Payload an edge requires before it may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadRule {
    None,
    Notes,
}

/// How an edge relates to the main line of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Forward progress along the main line.
    Advance,
    /// A reviewer sends the entity back to its producer.
    Reject,
    /// The producer picks a rejected entity up again.
    Resubmit,
    /// Soft termination.
    Cancel,
    /// Decided only through an approval chain.
    ChainDecision,
}

impl EdgeKind {
    fn payload_label(self) -> &'static str {
        match self {
            EdgeKind::Reject => "rejection",
            EdgeKind::Cancel => "cancellation",
            EdgeKind::ChainDecision => "review decision",
            EdgeKind::Advance | EdgeKind::Resubmit => "this transition",
        }
    }
}

/// One legal status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge<S> {
    pub from: S,
    pub to: S,
    pub roles: &'static [Role],
    pub payload: PayloadRule,
    pub kind: EdgeKind,
}

impl<S> Edge<S> {
    const fn advance(from: S, to: S, roles: &'static [Role]) -> Self {
        Self {
            from,
            to,
            roles,
            payload: PayloadRule::None,
            kind: EdgeKind::Advance,
        }
    }

    /// Main-line edge taken when an approval chain closes. `roles` names
    /// who signs last.
    const fn decided(from: S, to: S, roles: &'static [Role]) -> Self {
        Self {
            from,
            to,
            roles,
            payload: PayloadRule::None,
            kind: EdgeKind::ChainDecision,
        }
    }
}

/// Find the chain-decided edge from `current` to `target`.
fn chain_edge<S>(
    entity: &'static str,
    edges: Vec<Edge<S>>,
    current: S,
    target: S,
) -> Result<Edge<S>, CoreError>
where
    S: Copy + PartialEq + Display,
{
    edges
        .into_iter()
        .find(|e| e.to == target && e.kind == EdgeKind::ChainDecision)
        .ok_or_else(|| CoreError::IllegalTransition {
            entity,
            from: current.to_string(),
            to: target.to_string(),
        })
}

/// Pick the edge towards `target` and check role and payload against it.
///
/// Checks run in a fixed order so callers always see the most fundamental
/// failure first: missing edge, then role, then payload.
fn check_edge<S>(
    entity: &'static str,
    edges: Vec<Edge<S>>,
    current: S,
    target: S,
    role: Role,
    notes: Option<&str>,
) -> Result<Edge<S>, CoreError>
where
    S: Copy + PartialEq + Display,
{
    let edge = edges
        .into_iter()
        .find(|e| e.to == target)
        .ok_or_else(|| CoreError::IllegalTransition {
            entity,
            from: current.to_string(),
            to: target.to_string(),
        })?;

    if edge.kind == EdgeKind::ChainDecision {
        return Err(CoreError::Unauthorized {
            role: role.to_string(),
            action: format!(
                "move {entity} from '{current}' to '{target}' outside its approval chain"
            ),
        });
    }

    if !edge.roles.contains(&role) {
        return Err(CoreError::Unauthorized {
            role: role.to_string(),
            action: format!("move {entity} from '{current}' to '{target}'"),
        });
    }

    require_payload(&edge, notes)?;
    Ok(edge)
}

/// Enforce the payload rule of an edge.
pub fn require_payload<S>(edge: &Edge<S>, notes: Option<&str>) -> Result<(), CoreError> {
    if edge.payload == PayloadRule::Notes && !has_text(notes) {
        return Err(CoreError::MissingPayload(format!(
            "{} requires notes",
            edge.kind.payload_label()
        )));
    }
    Ok(())
}

/// True when the optional text holds at least one non-whitespace character.
pub fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Project graph
// ---------------------------------------------------------------------------

pub mod project {
    use super::*;
    use ProjectStatus as P;

    const CLIENT_OR_ADMIN: &[Role] = &[Role::Client, Role::AdminTeam];
    const DOCUMENT_VERIFIERS: &[Role] = &[Role::AdminTeam, Role::AdminLead];
    const PROJECT_LEAD: &[Role] = &[Role::ProjectLead];
    const FIELD: &[Role] = &[Role::Inspector, Role::ProjectLead];
    const DRAFTING: &[Role] = &[Role::Drafter, Role::ProjectLead];
    const REPORT_FORWARDERS: &[Role] = &[Role::AdminLead, Role::ProjectLead];
    const HEAD_CONSULTANT: &[Role] = &[Role::HeadConsultant];
    const ADMIN_OFFICE: &[Role] = &[Role::AdminTeam, Role::AdminLead];
    const ADMIN_LEAD: &[Role] = &[Role::AdminLead];
    const CANCELLERS: &[Role] = &[Role::AdminLead, Role::HeadConsultant];
    const CANCELLERS_FROM_DRAFT: &[Role] = &[Role::AdminLead, Role::HeadConsultant, Role::Client];

    /// Main-line edges, in lifecycle order.
    pub const MAIN_LINE: &[Edge<ProjectStatus>] = &[
        Edge::advance(P::Draft, P::Submitted, CLIENT_OR_ADMIN),
        Edge::advance(P::Submitted, P::ProjectLeadReview, DOCUMENT_VERIFIERS),
        Edge::advance(P::ProjectLeadReview, P::InspectionScheduled, PROJECT_LEAD),
        Edge::advance(P::InspectionScheduled, P::InspectionInProgress, FIELD),
        Edge::advance(P::InspectionInProgress, P::InspectionCompleted, FIELD),
        Edge::advance(P::InspectionCompleted, P::ReportSubmitted, DRAFTING),
        Edge::advance(P::ReportSubmitted, P::HeadConsultantReview, REPORT_FORWARDERS),
        Edge::decided(P::HeadConsultantReview, P::ApprovedByAdminLead, HEAD_CONSULTANT),
        Edge::advance(P::ApprovedByAdminLead, P::GovernmentSubmitted, ADMIN_OFFICE),
        Edge::advance(P::GovernmentSubmitted, P::SlfIssued, ADMIN_OFFICE),
        Edge::advance(P::SlfIssued, P::Completed, ADMIN_LEAD),
    ];

    pub fn is_terminal(status: ProjectStatus) -> bool {
        matches!(status, P::Completed | P::Cancelled)
    }

    /// The state a rejection in `review` returns the project to.
    ///
    /// `None` when `review` is not a review state.
    pub fn review_producer(review: ProjectStatus) -> Option<ProjectStatus> {
        match review {
            P::Submitted | P::ProjectLeadReview => Some(P::Draft),
            P::ReportSubmitted | P::HeadConsultantReview => Some(P::InspectionCompleted),
            _ => None,
        }
    }

    pub fn is_review_state(status: ProjectStatus) -> bool {
        review_producer(status).is_some()
    }

    /// Review states decided only through an approval chain. Entering one
    /// opens the chain; its close approves or rejects the project.
    pub fn opens_chain(status: ProjectStatus) -> bool {
        status == P::HeadConsultantReview
    }

    fn main_line_from(status: ProjectStatus) -> Option<&'static Edge<ProjectStatus>> {
        MAIN_LINE.iter().find(|e| e.from == status)
    }

    /// Every edge leaving `current`.
    ///
    /// `rejected_from` is the review state a rejected project was sent back
    /// from; it decides where resubmission leads.
    pub fn edges_from(
        current: ProjectStatus,
        rejected_from: Option<ProjectStatus>,
    ) -> Vec<Edge<ProjectStatus>> {
        let mut edges = Vec::new();

        if let Some(edge) = main_line_from(current) {
            edges.push(*edge);
        }

        if is_review_state(current) {
            let reviewers = main_line_from(current).map(|e| e.roles).unwrap_or(&[]);
            edges.push(Edge {
                from: current,
                to: P::Rejected,
                roles: reviewers,
                payload: PayloadRule::Notes,
                kind: if opens_chain(current) {
                    EdgeKind::ChainDecision
                } else {
                    EdgeKind::Reject
                },
            });
        }

        if current == P::Rejected {
            if let Some(producer) = rejected_from.and_then(review_producer) {
                let producer_roles = main_line_from(producer).map(|e| e.roles).unwrap_or(&[]);
                edges.push(Edge {
                    from: current,
                    to: producer,
                    roles: producer_roles,
                    payload: PayloadRule::None,
                    kind: EdgeKind::Resubmit,
                });
            }
        }

        if !is_terminal(current) {
            edges.push(Edge {
                from: current,
                to: P::Cancelled,
                roles: if current == P::Draft {
                    CANCELLERS_FROM_DRAFT
                } else {
                    CANCELLERS
                },
                payload: PayloadRule::Notes,
                kind: EdgeKind::Cancel,
            });
        }

        edges
    }

    /// Statuses directly reachable from `current`.
    pub fn successors(
        current: ProjectStatus,
        rejected_from: Option<ProjectStatus>,
    ) -> Vec<ProjectStatus> {
        edges_from(current, rejected_from)
            .into_iter()
            .map(|e| e.to)
            .collect()
    }

    /// Validate a requested project transition.
    pub fn check(
        current: ProjectStatus,
        rejected_from: Option<ProjectStatus>,
        target: ProjectStatus,
        role: Role,
        notes: Option<&str>,
    ) -> Result<Edge<ProjectStatus>, CoreError> {
        check_edge(
            "project",
            edges_from(current, rejected_from),
            current,
            target,
            role,
            notes,
        )
    }

    /// The chain-decided edge out of a chain-gated review state.
    pub fn decision_edge(
        current: ProjectStatus,
        target: ProjectStatus,
    ) -> Result<Edge<ProjectStatus>, CoreError> {
        chain_edge("project", edges_from(current, None), current, target)
    }
}

// ---------------------------------------------------------------------------
// Report graph
// ---------------------------------------------------------------------------

pub mod report {
    use super::*;
    use ReportStatus as R;

    const AUTHORS: &[Role] = &[Role::Drafter, Role::Inspector];
    const REVIEW_OPENERS: &[Role] = &[Role::ProjectLead, Role::AdminLead];
    const CANCELLERS: &[Role] = &[Role::ProjectLead, Role::AdminLead];

    const EDGES: &[Edge<ReportStatus>] = &[
        Edge::advance(R::Draft, R::Submitted, AUTHORS),
        Edge::advance(R::Submitted, R::UnderReview, REVIEW_OPENERS),
        Edge {
            from: R::UnderReview,
            to: R::Approved,
            roles: &[],
            payload: PayloadRule::None,
            kind: EdgeKind::ChainDecision,
        },
        Edge {
            from: R::UnderReview,
            to: R::Rejected,
            roles: &[],
            payload: PayloadRule::Notes,
            kind: EdgeKind::ChainDecision,
        },
        Edge {
            from: R::Rejected,
            to: R::Draft,
            roles: AUTHORS,
            payload: PayloadRule::None,
            kind: EdgeKind::Resubmit,
        },
        Edge {
            from: R::Draft,
            to: R::Cancelled,
            roles: CANCELLERS,
            payload: PayloadRule::Notes,
            kind: EdgeKind::Cancel,
        },
        Edge {
            from: R::Submitted,
            to: R::Cancelled,
            roles: CANCELLERS,
            payload: PayloadRule::Notes,
            kind: EdgeKind::Cancel,
        },
        Edge {
            from: R::Rejected,
            to: R::Cancelled,
            roles: CANCELLERS,
            payload: PayloadRule::Notes,
            kind: EdgeKind::Cancel,
        },
    ];

    pub fn is_terminal(status: ReportStatus) -> bool {
        matches!(status, R::Approved | R::Cancelled)
    }

    pub fn edges_from(current: ReportStatus) -> Vec<Edge<ReportStatus>> {
        EDGES.iter().filter(|e| e.from == current).copied().collect()
    }

    pub fn successors(current: ReportStatus) -> Vec<ReportStatus> {
        edges_from(current).into_iter().map(|e| e.to).collect()
    }

    /// Validate a requested report transition made directly by a user.
    pub fn check(
        current: ReportStatus,
        target: ReportStatus,
        role: Role,
        notes: Option<&str>,
    ) -> Result<Edge<ReportStatus>, CoreError> {
        check_edge("report", edges_from(current), current, target, role, notes)
    }

    /// The chain-decided edge out of `under_review`, for the approval coordinator.
    pub fn decision_edge(
        current: ReportStatus,
        target: ReportStatus,
    ) -> Result<Edge<ReportStatus>, CoreError> {
        chain_edge("report", edges_from(current), current, target)
    }
}

// ---------------------------------------------------------------------------
// Schedule graph
// ---------------------------------------------------------------------------

pub mod schedule {
    use super::*;
    use ScheduleStatus as S;

    const ANY: &[Role] = Role::ALL;
    const CLOSERS: &[Role] = &[Role::Inspector, Role::Drafter, Role::ProjectLead];
    const CANCELLERS: &[Role] = &[Role::ProjectLead, Role::AdminLead];

    const EDGES: &[Edge<ScheduleStatus>] = &[
        Edge::advance(S::Scheduled, S::InProgress, ANY),
        Edge::advance(S::InProgress, S::Completed, CLOSERS),
        Edge {
            from: S::Scheduled,
            to: S::Cancelled,
            roles: CANCELLERS,
            payload: PayloadRule::Notes,
            kind: EdgeKind::Cancel,
        },
        Edge {
            from: S::InProgress,
            to: S::Cancelled,
            roles: CANCELLERS,
            payload: PayloadRule::Notes,
            kind: EdgeKind::Cancel,
        },
    ];

    pub fn is_terminal(status: ScheduleStatus) -> bool {
        matches!(status, S::Completed | S::Cancelled)
    }

    pub fn edges_from(current: ScheduleStatus) -> Vec<Edge<ScheduleStatus>> {
        EDGES.iter().filter(|e| e.from == current).copied().collect()
    }

    pub fn successors(current: ScheduleStatus) -> Vec<ScheduleStatus> {
        edges_from(current).into_iter().map(|e| e.to).collect()
    }

    pub fn check(
        current: ScheduleStatus,
        target: ScheduleStatus,
        role: Role,
        notes: Option<&str>,
    ) -> Result<Edge<ScheduleStatus>, CoreError> {
        check_edge("schedule", edges_from(current), current, target, role, notes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
