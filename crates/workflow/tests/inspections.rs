//! Schedules, assignment, inspection starts and checklist answers.

mod common;

use assert_matches::assert_matches;
use common::Harness;
use serde_json::json;
use slf_core::checklist::ResponseKind;
use slf_core::error::CoreError;
use slf_core::geotag::{GpsFailure, LocationCapture, LocationKind};
use slf_core::roles::Role;
use slf_core::status::{ProjectStatus, ResponseStatus, ScheduleStatus, ScheduleType};
use slf_db::models::checklist::{ChecklistItem, CreateChecklistItem};
use slf_db::store::EntityStore;
use slf_workflow::{TransitionRequest, WorkflowSettings};

fn manual(note: &str) -> LocationCapture {
    LocationCapture::Manual {
        note: note.to_string(),
        gps_failure: Some(GpsFailure::PermissionDenied),
    }
}

async fn radio_item(h: &Harness) -> ChecklistItem {
    h.workflow
        .checklists
        .create_item(
            CreateChecklistItem {
                code: "STR-01".into(),
                category: "structure".into(),
                label: "Visible cracks in load-bearing columns".into(),
                response_kind: ResponseKind::Radio,
                options: vec!["none".into(), "minor".into(), "severe".into()],
                min_value: None,
                max_value: None,
                is_required: true,
            },
            h.admin_lead,
        )
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Inspection start
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_manual_start_then_second_start_is_illegal() {
    let h = Harness::new().await;
    let project = h.project().await;
    let schedule = h.assigned_inspection(project.id).await;
    let schedules = &h.workflow.schedules;

    let started = schedules
        .start_inspection(
            schedule.id,
            h.inspector,
            manual("Front gate of Ruko Sudirman Blok A"),
            Some(schedule.version),
        )
        .await
        .unwrap();
    assert_eq!(started.status, ScheduleStatus::InProgress);
    assert!(started.started_at.is_some());

    let location = schedules
        .get_location(schedule.id, &h.inspector)
        .await
        .unwrap()
        .expect("location recorded");
    assert_eq!(location.kind, LocationKind::Manual);
    assert_eq!(location.note.as_deref(), Some("Front gate of Ruko Sudirman Blok A"));
    assert_eq!(location.gps_failure, Some(GpsFailure::PermissionDenied));
    assert_eq!(location.latitude, None);

    let again = schedules
        .start_inspection(
            schedule.id,
            h.inspector,
            LocationCapture::Gps {
                latitude: -6.2,
                longitude: 106.8,
                accuracy_m: Some(5.0),
            },
            None,
        )
        .await;
    assert_matches!(again, Err(CoreError::IllegalTransition { entity: "schedule", .. }));
    let location = schedules.get_location(schedule.id, &h.inspector).await.unwrap().unwrap();
    assert_eq!(location.kind, LocationKind::Manual);
}

#[tokio::test]
async fn test_gps_start_stores_coordinates() {
    let h = Harness::new().await;
    let project = h.project().await;
    let schedule = h.assigned_inspection(project.id).await;

    h.workflow
        .schedules
        .start_inspection(
            schedule.id,
            h.inspector,
            LocationCapture::Gps {
                latitude: -6.2088,
                longitude: 106.8456,
                accuracy_m: Some(12.5),
            },
            None,
        )
        .await
        .unwrap();

    let location = h
        .workflow
        .schedules
        .get_location(schedule.id, &h.project_lead)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(location.kind, LocationKind::Gps);
    assert_eq!(location.latitude, Some(-6.2088));
    assert_eq!(location.longitude, Some(106.8456));
    assert_eq!(location.accuracy_m, Some(12.5));
    assert_eq!(location.captured_by, h.inspector.user_id);
}

#[tokio::test]
async fn test_invalid_captures_are_refused_before_any_write() {
    let h = Harness::new().await;
    let project = h.project().await;
    let schedule = h.assigned_inspection(project.id).await;

    let off_globe = LocationCapture::Gps {
        latitude: 91.0,
        longitude: 0.0,
        accuracy_m: None,
    };
    let schedules = &h.workflow.schedules;
    let result = schedules
        .start_inspection(schedule.id, h.inspector, off_globe, None)
        .await;
    assert_matches!(result, Err(CoreError::Validation(_)));
    let result = schedules
        .start_inspection(schedule.id, h.inspector, manual("   "), None)
        .await;
    assert_matches!(result, Err(CoreError::MissingPayload(_)));

    let stored = h.store.get_schedule(schedule.id).await.unwrap();
    assert_eq!(stored.status, ScheduleStatus::Scheduled);
}

#[tokio::test]
async fn test_only_the_assignee_starts_an_inspection() {
    let h = Harness::new().await;
    let project = h.project().await;
    let schedule = h.assigned_inspection(project.id).await;

    let result = h
        .workflow
        .schedules
        .start_inspection(schedule.id, h.project_lead, manual("Lobby"), None)
        .await;
    assert_matches!(result, Err(CoreError::Forbidden(_)));
}

#[tokio::test]
async fn test_second_active_inspection_conflicts() {
    let h = Harness::new().await;
    let project = h.project().await;
    let first = h.assigned_inspection(project.id).await;
    let second = h.assigned_inspection(project.id).await;
    let schedules = &h.workflow.schedules;

    schedules
        .start_inspection(first.id, h.inspector, manual("Block A"), None)
        .await
        .unwrap();
    let result = schedules
        .start_inspection(second.id, h.inspector, manual("Block B"), None)
        .await;
    assert_matches!(result, Err(CoreError::Conflict(_)));

    schedules
        .complete_schedule(first.id, h.inspector, None, None)
        .await
        .unwrap();
    schedules
        .start_inspection(second.id, h.inspector, manual("Block B"), None)
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_racing_starts_leave_one_winner_and_one_stale() {
    let h = Harness::new().await;
    let project = h.project().await;
    let schedule = h.assigned_inspection(project.id).await;

    let start = |note: &'static str| {
        let schedules = h.workflow.schedules.clone();
        let inspector = h.inspector;
        let (id, version) = (schedule.id, schedule.version);
        tokio::spawn(async move {
            schedules
                .start_inspection(id, inspector, manual(note), Some(version))
                .await
        })
    };
    let (first, second) = tokio::join!(start("North gate"), start("South gate"));
    let results = [first.unwrap(), second.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_matches!(loser, CoreError::StaleState { entity: "schedule", .. });

    let stored = h.store.get_schedule(schedule.id).await.unwrap();
    assert_eq!(stored.status, ScheduleStatus::InProgress);
    assert_eq!(stored.version, schedule.version + 1);
}

#[tokio::test]
async fn test_generic_start_of_inspection_needs_a_location() {
    let h = Harness::new().await;
    let project = h.project().await;
    let schedule = h.assigned_inspection(project.id).await;

    let result = h
        .workflow
        .schedules
        .request_transition(
            schedule.id,
            TransitionRequest::new(ScheduleStatus::InProgress, h.inspector),
        )
        .await;
    assert_matches!(result, Err(CoreError::MissingPayload(_)));
}

#[tokio::test]
async fn test_meetings_start_without_a_location() {
    let h = Harness::new().await;
    let project = h.project().await;
    let meeting = h.schedule(project.id, ScheduleType::Meeting).await;

    let started = h
        .workflow
        .schedules
        .request_transition(
            meeting.id,
            TransitionRequest::new(ScheduleStatus::InProgress, h.project_lead),
        )
        .await
        .unwrap();
    assert_eq!(started.status, ScheduleStatus::InProgress);
    assert!(h
        .workflow
        .schedules
        .get_location(meeting.id, &h.project_lead)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_cancellation_requires_notes() {
    let h = Harness::new().await;
    let project = h.project().await;
    let schedule = h.assigned_inspection(project.id).await;
    let schedules = &h.workflow.schedules;

    let blank = schedules
        .cancel_schedule(schedule.id, h.project_lead, None, None)
        .await;
    assert_matches!(blank, Err(CoreError::MissingPayload(_)));

    let cancelled = schedules
        .cancel_schedule(
            schedule.id,
            h.project_lead,
            Some("Building closed for renovation".into()),
            None,
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, ScheduleStatus::Cancelled);
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_assignee_role_must_fit_the_schedule_type() {
    let h = Harness::new().await;
    let project = h.project().await;
    let inspection = h.schedule(project.id, ScheduleType::Inspection).await;
    let drafting = h.schedule(project.id, ScheduleType::ReportDrafting).await;
    let assignments = &h.workflow.assignments;

    let result = assignments
        .assign(inspection.id, h.drafter.user_id, h.project_lead, None)
        .await;
    assert_matches!(
        result,
        Err(CoreError::RoleMismatch { required, actual, .. })
            if required == "inspector" && actual == "drafter"
    );

    let assigned = assignments
        .assign(drafting.id, h.drafter.user_id, h.project_lead, None)
        .await
        .unwrap();
    assert_eq!(assigned.assigned_to, Some(h.drafter.user_id));
}

#[tokio::test]
async fn test_assignee_must_be_on_the_team() {
    let h = Harness::new().await;
    let project = h.project().await;
    let schedule = h.schedule(project.id, ScheduleType::Inspection).await;
    let stranger = h.outsider("freelance@inspect.id", Role::Inspector).await;
    let assignments = &h.workflow.assignments;

    let result = assignments
        .assign(schedule.id, stranger.user_id, h.project_lead, None)
        .await;
    assert_matches!(result, Err(CoreError::NotTeamMember { user_id, .. }) if user_id == stranger.user_id);

    assignments
        .add_team_member(project.id, stranger.user_id, h.project_lead)
        .await
        .unwrap();
    let assigned = assignments
        .assign(schedule.id, stranger.user_id, h.project_lead, None)
        .await
        .unwrap();
    assert_eq!(assigned.assigned_to, Some(stranger.user_id));
}

#[tokio::test]
async fn test_only_assigners_hand_out_work() {
    let h = Harness::new().await;
    let project = h.project().await;
    let schedule = h.schedule(project.id, ScheduleType::Inspection).await;

    let result = h
        .workflow
        .assignments
        .assign(schedule.id, h.inspector.user_id, h.admin_team, None)
        .await;
    assert_matches!(result, Err(CoreError::Unauthorized { .. }));
}

#[tokio::test]
async fn test_reassignment_after_start_is_illegal() {
    let h = Harness::new().await;
    let project = h.project().await;
    let schedule = h.assigned_inspection(project.id).await;
    let second = h.outsider("second@consult.id", Role::Inspector).await;
    h.workflow
        .assignments
        .add_team_member(project.id, second.user_id, h.project_lead)
        .await
        .unwrap();
    h.workflow
        .schedules
        .start_inspection(schedule.id, h.inspector, manual("Basement parking"), None)
        .await
        .unwrap();

    let result = h
        .workflow
        .assignments
        .assign(schedule.id, second.user_id, h.project_lead, None)
        .await;
    assert_matches!(result, Err(CoreError::IllegalTransition { .. }));
    let stored = h.store.get_schedule(schedule.id).await.unwrap();
    assert_eq!(stored.assigned_to, Some(h.inspector.user_id));
}

#[tokio::test]
async fn test_assigning_the_same_user_again_changes_nothing() {
    let h = Harness::new().await;
    let project = h.project().await;
    let schedule = h.assigned_inspection(project.id).await;

    let again = h
        .workflow
        .assignments
        .assign(schedule.id, h.inspector.user_id, h.admin_lead, None)
        .await
        .unwrap();
    assert_eq!(again.version, schedule.version);
    assert_eq!(again.assigned_to, Some(h.inspector.user_id));
}

// ---------------------------------------------------------------------------
// Checklist
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_checklist_answers_replace_each_other() {
    let h = Harness::new().await;
    let project = h.project().await;
    let schedule = h.assigned_inspection(project.id).await;
    let item = radio_item(&h).await;
    h.workflow
        .schedules
        .start_inspection(schedule.id, h.inspector, manual("Column C3"), None)
        .await
        .unwrap();
    let checklists = &h.workflow.checklists;

    let draft = checklists
        .save_response(schedule.id, item.id, h.inspector, json!({ "value": "minor" }), false)
        .await
        .unwrap();
    assert_eq!(draft.status, ResponseStatus::Draft);

    let submitted = checklists
        .save_response(
            schedule.id,
            item.id,
            h.inspector,
            json!({ "value": "severe", "remarks": "Diagonal crack, 40 cm" }),
            true,
        )
        .await
        .unwrap();
    assert_eq!(submitted.id, draft.id);
    assert_eq!(submitted.status, ResponseStatus::Submitted);

    let responses = checklists
        .list_responses(schedule.id, &h.project_lead)
        .await
        .unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].payload["value"], "severe");
}

#[tokio::test]
async fn test_answer_outside_the_options_is_refused() {
    let h = Harness::new().await;
    let project = h.project().await;
    let schedule = h.assigned_inspection(project.id).await;
    let item = radio_item(&h).await;
    h.workflow
        .schedules
        .start_inspection(schedule.id, h.inspector, manual("Column C3"), None)
        .await
        .unwrap();

    let result = h
        .workflow
        .checklists
        .save_response(schedule.id, item.id, h.inspector, json!({ "value": "cracked" }), true)
        .await;
    assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("none, minor, severe"));
}

#[tokio::test]
async fn test_answers_need_a_running_inspection() {
    let h = Harness::new().await;
    let project = h.project().await;
    let schedule = h.assigned_inspection(project.id).await;
    let item = radio_item(&h).await;

    let result = h
        .workflow
        .checklists
        .save_response(schedule.id, item.id, h.inspector, json!({ "value": "none" }), false)
        .await;
    assert_matches!(result, Err(CoreError::Conflict(_)));
}

#[tokio::test]
async fn test_only_office_admins_edit_the_checklist() {
    let h = Harness::new().await;
    let result = h
        .workflow
        .checklists
        .create_item(
            CreateChecklistItem {
                code: "FIRE-02".into(),
                category: "fire".into(),
                label: "Extinguisher pressure".into(),
                response_kind: ResponseKind::Numeric,
                options: vec![],
                min_value: Some(0.0),
                max_value: Some(20.0),
                is_required: false,
            },
            h.inspector,
        )
        .await;
    assert_matches!(result, Err(CoreError::Unauthorized { .. }));
}

// ---------------------------------------------------------------------------
// Auto-advance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_auto_advance_follows_the_inspections() {
    let settings = WorkflowSettings {
        auto_advance: true,
        ..WorkflowSettings::default()
    };
    let h = Harness::with_settings(settings).await;
    let project = h.project().await;
    h.force_status(project.id, ProjectStatus::InspectionScheduled, None).await;
    let schedule = h.assigned_inspection(project.id).await;
    let schedules = &h.workflow.schedules;

    schedules
        .start_inspection(schedule.id, h.inspector, manual("Rooftop"), None)
        .await
        .unwrap();
    let project_now = h.store.get_project(project.id).await.unwrap();
    assert_eq!(project_now.status, ProjectStatus::InspectionInProgress);

    schedules
        .complete_schedule(schedule.id, h.inspector, None, None)
        .await
        .unwrap();
    let project_now = h.store.get_project(project.id).await.unwrap();
    assert_eq!(project_now.status, ProjectStatus::InspectionCompleted);
}

#[tokio::test]
async fn test_auto_advance_waits_for_every_open_inspection() {
    let settings = WorkflowSettings {
        auto_advance: true,
        ..WorkflowSettings::default()
    };
    let h = Harness::with_settings(settings).await;
    let project = h.project().await;
    h.force_status(project.id, ProjectStatus::InspectionScheduled, None).await;
    let first = h.assigned_inspection(project.id).await;
    h.assigned_inspection(project.id).await;
    let schedules = &h.workflow.schedules;

    schedules
        .start_inspection(first.id, h.inspector, manual("Block A"), None)
        .await
        .unwrap();
    schedules
        .complete_schedule(first.id, h.inspector, None, None)
        .await
        .unwrap();

    let project_now = h.store.get_project(project.id).await.unwrap();
    assert_eq!(project_now.status, ProjectStatus::InspectionInProgress);
}

#[tokio::test]
async fn test_project_stays_put_without_auto_advance() {
    let h = Harness::new().await;
    let project = h.project().await;
    h.force_status(project.id, ProjectStatus::InspectionScheduled, None).await;
    let schedule = h.assigned_inspection(project.id).await;

    h.workflow
        .schedules
        .start_inspection(schedule.id, h.inspector, manual("Rooftop"), None)
        .await
        .unwrap();
    let project_now = h.store.get_project(project.id).await.unwrap();
    assert_eq!(project_now.status, ProjectStatus::InspectionScheduled);
}
