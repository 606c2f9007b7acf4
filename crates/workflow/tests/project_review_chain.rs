//! Head consultant review of projects through sequenced approval chains.

mod common;

use assert_matches::assert_matches;
use common::Harness;
use slf_core::approval::{ChainDefinition, ChainOutcome, Decision};
use slf_core::error::CoreError;
use slf_core::roles::Role;
use slf_core::status::{ChainStatus, EntityKind, ProjectStatus as P, StepDecision};
use slf_db::models::project::Project;
use slf_db::store::EntityStore;
use slf_events::kinds;
use slf_workflow::retry::RetryPolicy;
use slf_workflow::{ProjectDecisionResult, TransitionRequest, WorkflowSettings};

const SIGN_OFF: [Role; 4] = [
    Role::AdminTeam,
    Role::ProjectLead,
    Role::AdminLead,
    Role::HeadConsultant,
];

/// A project forwarded from `report_submitted` by the admin lead.
async fn in_review(h: &Harness) -> Project {
    let project = h.project().await;
    h.force_status(project.id, P::ReportSubmitted, None).await;
    h.workflow
        .engine
        .request_project_transition(
            project.id,
            TransitionRequest::new(P::HeadConsultantReview, h.admin_lead),
        )
        .await
        .unwrap()
}

async fn approve(h: &Harness, project: &Project, role: Role) -> ProjectDecisionResult {
    h.workflow
        .approvals
        .record_project_decision(project.id, role, Decision::Approved, None, h.actor(role))
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Chain lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_forwarding_opens_the_sign_off_chain() {
    let h = Harness::new().await;
    let project = in_review(&h).await;
    assert_eq!(project.status, P::HeadConsultantReview);

    let active = h
        .store
        .get_active_chain(EntityKind::Project, project.id)
        .await
        .unwrap()
        .expect("chain opened with the move");
    let roles: Vec<Role> = active.steps.iter().map(|s| s.role).collect();
    assert_eq!(roles, SIGN_OFF.to_vec());
    assert!(active.steps.iter().all(|s| s.decision == StepDecision::Pending));

    let history = h
        .store
        .list_transitions(EntityKind::Project, project.id)
        .await
        .unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.from_status, "report_submitted");
    assert_eq!(last.to_status, "head_consultant_review");

    let admin_inbox = h.workflow.inbox.list(&h.admin_team, true).await.unwrap();
    assert!(admin_inbox.iter().any(|n| n.kind == kinds::REVIEW_STEP_PENDING));
}

#[tokio::test]
async fn test_full_sign_off_approves_the_project() {
    let h = Harness::new().await;
    let project = in_review(&h).await;

    for (i, role) in SIGN_OFF[..3].iter().enumerate() {
        let step = approve(&h, &project, *role).await;
        assert_matches!(
            step.outcome,
            ChainOutcome::Advanced { next_position, .. } if next_position == i as i32 + 2
        );
        assert_eq!(step.project.status, P::HeadConsultantReview);
    }

    let done = approve(&h, &project, Role::HeadConsultant).await;
    assert_eq!(done.outcome, ChainOutcome::Approved);
    assert_eq!(done.project.status, P::ApprovedByAdminLead);
    assert_eq!(done.chain.chain.status, ChainStatus::Approved);
    assert!(done
        .chain
        .steps
        .iter()
        .all(|s| s.decision == StepDecision::Approved));

    let history = h
        .workflow
        .engine
        .project_history(project.id, &h.admin_lead)
        .await
        .unwrap();
    let last = history.last().unwrap();
    assert_eq!(
        (last.from_status.as_str(), last.to_status.as_str()),
        ("head_consultant_review", "approved_by_admin_lead")
    );
    assert_eq!(last.actor_id, h.head_consultant.user_id);
}

#[tokio::test]
async fn test_rejection_returns_the_project_to_drafting() {
    let h = Harness::new().await;
    let project = in_review(&h).await;
    approve(&h, &project, Role::AdminTeam).await;

    let rejected = h
        .workflow
        .approvals
        .record_project_decision(
            project.id,
            Role::ProjectLead,
            Decision::Rejected,
            Some(" Structural calculations unsigned "),
            h.project_lead,
        )
        .await
        .unwrap();
    assert_eq!(rejected.outcome, ChainOutcome::Rejected);
    assert_eq!(rejected.project.status, P::Rejected);
    assert_eq!(rejected.project.rejected_from, Some(P::HeadConsultantReview));
    assert_eq!(
        rejected.project.rejection_notes.as_deref(),
        Some("Structural calculations unsigned")
    );
    assert_eq!(rejected.chain.chain.status, ChainStatus::Rejected);
    assert_eq!(rejected.chain.steps[2].decision, StepDecision::Pending);

    let client_inbox = h.workflow.inbox.list(&h.client, true).await.unwrap();
    assert!(client_inbox.iter().any(|n| n.kind == kinds::PROJECT_REJECTED));

    let reworked = h
        .workflow
        .engine
        .request_project_transition(
            project.id,
            TransitionRequest::new(P::InspectionCompleted, h.drafter),
        )
        .await
        .unwrap();
    assert_eq!(reworked.status, P::InspectionCompleted);
    assert_eq!(reworked.rejected_from, None);
}

#[tokio::test]
async fn test_second_review_opens_a_fresh_chain() {
    let h = Harness::with_settings(WorkflowSettings {
        project_approval_chain: ChainDefinition::new(vec![Role::HeadConsultant]).unwrap(),
        ..WorkflowSettings::default()
    })
    .await;
    let project = in_review(&h).await;
    h.workflow
        .approvals
        .record_project_decision(
            project.id,
            Role::HeadConsultant,
            Decision::Rejected,
            Some("Fire exits missing"),
            h.head_consultant,
        )
        .await
        .unwrap();

    let engine = &h.workflow.engine;
    for (target, actor) in [
        (P::InspectionCompleted, h.drafter),
        (P::ReportSubmitted, h.drafter),
        (P::HeadConsultantReview, h.project_lead),
    ] {
        engine
            .request_project_transition(project.id, TransitionRequest::new(target, actor))
            .await
            .unwrap();
    }
    let done = approve(&h, &project, Role::HeadConsultant).await;
    assert_eq!(done.project.status, P::ApprovedByAdminLead);

    let chains = h
        .workflow
        .approvals
        .list_project_chains(project.id, &h.admin_lead)
        .await
        .unwrap();
    let statuses: Vec<ChainStatus> = chains.iter().map(|c| c.chain.status).collect();
    assert_eq!(statuses, vec![ChainStatus::Rejected, ChainStatus::Approved]);
}

// ---------------------------------------------------------------------------
// Refusals
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_head_consultant_cannot_skip_the_chain() {
    let h = Harness::new().await;
    let project = in_review(&h).await;

    for target in [P::ApprovedByAdminLead, P::Rejected] {
        let result = h
            .workflow
            .engine
            .request_project_transition(
                project.id,
                TransitionRequest::new(target, h.head_consultant).with_notes("looks fine"),
            )
            .await;
        assert_matches!(result, Err(CoreError::Unauthorized { .. }));
    }

    let early = h
        .workflow
        .approvals
        .record_project_decision(
            project.id,
            Role::HeadConsultant,
            Decision::Approved,
            None,
            h.head_consultant,
        )
        .await;
    assert_matches!(early, Err(CoreError::Unauthorized { .. }));

    let stored = h.store.get_project(project.id).await.unwrap();
    assert_eq!(stored.status, P::HeadConsultantReview);
    assert_eq!(stored.version, project.version);
}

#[tokio::test]
async fn test_decision_outside_review_is_illegal() {
    let h = Harness::new().await;
    let project = h.project().await;
    h.force_status(project.id, P::ReportSubmitted, None).await;

    let result = h
        .workflow
        .approvals
        .record_project_decision(
            project.id,
            Role::AdminTeam,
            Decision::Approved,
            None,
            h.admin_team,
        )
        .await;
    assert_matches!(result, Err(CoreError::IllegalTransition { entity: "project", .. }));
}

#[tokio::test]
async fn test_cancellation_abandons_the_chain() {
    let h = Harness::new().await;
    let project = in_review(&h).await;
    approve(&h, &project, Role::AdminTeam).await;

    let cancelled = h
        .workflow
        .engine
        .request_project_transition(
            project.id,
            TransitionRequest::new(P::Cancelled, h.admin_lead).with_notes("Client withdrew"),
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, P::Cancelled);

    assert!(h
        .store
        .get_active_chain(EntityKind::Project, project.id)
        .await
        .unwrap()
        .is_none());
    let chains = h
        .workflow
        .approvals
        .list_project_chains(project.id, &h.admin_lead)
        .await
        .unwrap();
    assert_eq!(chains.len(), 1);
    assert_ne!(chains[0].chain.status, ChainStatus::InFlight);

    let late = h
        .workflow
        .approvals
        .record_project_decision(
            project.id,
            Role::ProjectLead,
            Decision::Approved,
            None,
            h.project_lead,
        )
        .await;
    assert_matches!(late, Err(CoreError::IllegalTransition { .. }));
}

#[tokio::test]
async fn test_configured_chain_replaces_the_default() {
    let h = Harness::with_settings(WorkflowSettings {
        project_approval_chain: ChainDefinition::new(vec![Role::AdminLead, Role::HeadConsultant])
            .unwrap(),
        ..WorkflowSettings::default()
    })
    .await;
    let project = in_review(&h).await;

    approve(&h, &project, Role::AdminLead).await;
    let done = approve(&h, &project, Role::HeadConsultant).await;
    assert_eq!(done.project.status, P::ApprovedByAdminLead);
    assert_eq!(done.chain.steps.len(), 2);
}

// ---------------------------------------------------------------------------
// Storage failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_failed_open_leaves_the_project_in_place() {
    let h = Harness::with_settings(WorkflowSettings {
        retry: RetryPolicy::with_attempts(0),
        ..WorkflowSettings::default()
    })
    .await;
    let project = h.project().await;
    let before = h.force_status(project.id, P::ReportSubmitted, None).await;

    h.faults.fail("open_review");
    let result = h
        .workflow
        .engine
        .request_project_transition(
            project.id,
            TransitionRequest::new(P::HeadConsultantReview, h.admin_lead),
        )
        .await;
    assert_matches!(result, Err(CoreError::StorageUnavailable(_)));

    let stored = h.store.get_project(project.id).await.unwrap();
    assert_eq!(stored.status, P::ReportSubmitted);
    assert_eq!(stored.version, before.version);
    assert!(h
        .store
        .list_chains(EntityKind::Project, project.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_failed_final_sign_off_changes_nothing() {
    let h = Harness::with_settings(WorkflowSettings {
        retry: RetryPolicy::with_attempts(0),
        project_approval_chain: ChainDefinition::new(vec![Role::HeadConsultant]).unwrap(),
        ..WorkflowSettings::default()
    })
    .await;
    let project = in_review(&h).await;

    h.faults.fail("close_review");
    let result = h
        .workflow
        .approvals
        .record_project_decision(
            project.id,
            Role::HeadConsultant,
            Decision::Approved,
            None,
            h.head_consultant,
        )
        .await;
    assert_matches!(result, Err(CoreError::StorageUnavailable(_)));

    let stored = h.store.get_project(project.id).await.unwrap();
    assert_eq!(stored.status, P::HeadConsultantReview);
    assert_eq!(stored.version, project.version);
    let active = h
        .store
        .get_active_chain(EntityKind::Project, project.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.steps[0].decision, StepDecision::Pending);

    h.faults.heal("close_review");
    let done = approve(&h, &project, Role::HeadConsultant).await;
    assert_eq!(done.project.status, P::ApprovedByAdminLead);
}
