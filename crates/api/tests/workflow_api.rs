//! Inspections, reports and notifications over HTTP.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{expect_status, TestApp};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use slf_core::approval::Decision;
use slf_core::roles::Role;
use slf_core::status::{EntityKind, ProjectStatus};
use slf_core::types::Actor;
use slf_db::models::project::ProjectTransition;
use slf_db::models::transition::NewTransition;
use slf_db::store::EntityStore;
use slf_workflow::UploadDocument;

/// A project with a lead, an inspector and a drafter on the team.
struct Site {
    app: TestApp,
    project_id: i64,
    client_actor: Actor,
    client: String,
    admin_actor: Actor,
    admin_team: String,
    lead: String,
    inspector: (Actor, String),
    drafter: (Actor, String),
    head: String,
}

impl Site {
    async fn new() -> Self {
        let app = TestApp::new();
        let (client_actor, client) = app.user("client@pt-maju.co.id", Role::Client).await;
        let (admin_actor, admin_team) = app.user("admin@consult.id", Role::AdminTeam).await;
        let (lead_actor, lead) = app.user("lead@consult.id", Role::ProjectLead).await;
        let inspector = app.user("inspector@consult.id", Role::Inspector).await;
        let drafter = app.user("drafter@consult.id", Role::Drafter).await;
        let (_, head) = app.user("head@consult.id", Role::HeadConsultant).await;

        let created = app
            .post_json(
                "/api/v1/projects",
                &client,
                json!({
                    "name": "Pabrik Garmen Cileungsi",
                    "address": "Jl. Raya Narogong km 12",
                    "city": "Bogor",
                    "application_type": "slf",
                    "client_id": client_actor.user_id,
                    "project_lead_id": lead_actor.user_id,
                }),
            )
            .await;
        let project_id = expect_status(created, StatusCode::CREATED).await["data"]["id"]
            .as_i64()
            .unwrap();
        app.store
            .add_team_member(project_id, drafter.0.user_id)
            .await
            .unwrap();

        Self {
            app,
            project_id,
            client_actor,
            client,
            admin_actor,
            admin_team,
            lead,
            inspector,
            drafter,
            head,
        }
    }

    async fn inspection(&self) -> Value {
        let response = self
            .app
            .post_json(
                &format!("/api/v1/projects/{}/schedules", self.project_id),
                &self.lead,
                json!({
                    "schedule_type": "inspection",
                    "scheduled_date": "2026-11-02T09:00:00Z",
                    "notes": "Bring the structural drawings",
                }),
            )
            .await;
        expect_status(response, StatusCode::CREATED).await["data"].clone()
    }
}

// ---------------------------------------------------------------------------
// Inspections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn assign_and_start_with_a_manual_location() {
    let site = Site::new().await;
    let app = &site.app;
    let (inspector, inspector_token) = &site.inspector;
    let schedule = site.inspection().await;
    let id = schedule["id"].as_i64().unwrap();
    assert_eq!(schedule["status"], "scheduled");

    let outsider = app
        .post_json(
            &format!("/api/v1/schedules/{id}/assign"),
            &site.lead,
            json!({ "user_id": inspector.user_id }),
        )
        .await;
    let json = expect_status(outsider, StatusCode::FORBIDDEN).await;
    assert_eq!(json["code"], "NOT_TEAM_MEMBER");

    app.store
        .add_team_member(site.project_id, inspector.user_id)
        .await
        .unwrap();
    let assigned = app
        .post_json(
            &format!("/api/v1/schedules/{id}/assign"),
            &site.lead,
            json!({ "user_id": inspector.user_id }),
        )
        .await;
    let json = expect_status(assigned, StatusCode::OK).await;
    assert_eq!(json["data"]["assigned_to"], inspector.user_id);

    let start = json!({
        "location": {
            "type": "manual",
            "note": "Basement level, no GPS signal. Gate 3 of the east block.",
            "gps_failure": "position_unavailable",
        }
    });
    let started = app
        .post_json(&format!("/api/v1/schedules/{id}/start"), inspector_token, start.clone())
        .await;
    let json = expect_status(started, StatusCode::OK).await;
    assert_eq!(json["data"]["status"], "in_progress");

    let location = app
        .get(&format!("/api/v1/schedules/{id}/location"), inspector_token)
        .await;
    let json = expect_status(location, StatusCode::OK).await;
    assert_eq!(json["data"]["kind"], "manual");
    assert_eq!(json["data"]["gps_failure"], "position_unavailable");

    let again = app
        .post_json(&format!("/api/v1/schedules/{id}/start"), inspector_token, start)
        .await;
    let json = expect_status(again, StatusCode::CONFLICT).await;
    assert_eq!(json["code"], "ILLEGAL_TRANSITION");
}

#[tokio::test]
async fn inspection_start_without_location_is_422() {
    let site = Site::new().await;
    let (inspector, inspector_token) = &site.inspector;
    site.app
        .store
        .add_team_member(site.project_id, inspector.user_id)
        .await
        .unwrap();
    let id = site.inspection().await["id"].as_i64().unwrap();
    site.app
        .post_json(
            &format!("/api/v1/schedules/{id}/assign"),
            &site.lead,
            json!({ "user_id": inspector.user_id }),
        )
        .await;

    let response = site
        .app
        .post_json(&format!("/api/v1/schedules/{id}/start"), inspector_token, json!({}))
        .await;
    let json = expect_status(response, StatusCode::UNPROCESSABLE_ENTITY).await;
    assert_eq!(json["code"], "MISSING_PAYLOAD");
}

#[tokio::test]
async fn cancel_requires_notes() {
    let site = Site::new().await;
    let id = site.inspection().await["id"].as_i64().unwrap();
    let uri = format!("/api/v1/schedules/{id}/cancel");

    let bare = site.app.post_json(&uri, &site.lead, json!({})).await;
    assert_eq!(bare.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let cancelled = site
        .app
        .post_json(&uri, &site.lead, json!({ "notes": "Owner postponed the visit" }))
        .await;
    let json = expect_status(cancelled, StatusCode::OK).await;
    assert_eq!(json["data"]["status"], "cancelled");
}

#[tokio::test]
async fn checklist_answers_are_upserted() {
    let site = Site::new().await;
    let app = &site.app;
    let (inspector, inspector_token) = &site.inspector;
    app.store
        .add_team_member(site.project_id, inspector.user_id)
        .await
        .unwrap();
    let id = site.inspection().await["id"].as_i64().unwrap();
    app.post_json(
        &format!("/api/v1/schedules/{id}/assign"),
        &site.lead,
        json!({ "user_id": inspector.user_id }),
    )
    .await;
    app.post_json(
        &format!("/api/v1/schedules/{id}/start"),
        inspector_token,
        json!({ "location": { "type": "gps", "latitude": -6.41, "longitude": 106.96, "accuracy_m": 8.5 } }),
    )
    .await;

    let item = app
        .post_json(
            "/api/v1/checklist-items",
            &site.admin_team,
            json!({
                "code": "FIRE-02",
                "category": "fire_safety",
                "label": "Hydrant pressure (bar)",
                "response_kind": "numeric",
                "min_value": 0.0,
                "max_value": 20.0,
                "is_required": true,
            }),
        )
        .await;
    let item_id = expect_status(item, StatusCode::CREATED).await["data"]["id"]
        .as_i64()
        .unwrap();
    let answer_uri = format!("/api/v1/schedules/{id}/checklist/{item_id}");

    let first = app
        .put_json(&answer_uri, inspector_token, json!({ "payload": { "value": 4.5 } }))
        .await;
    let first = expect_status(first, StatusCode::OK).await;
    let second = app
        .put_json(
            &answer_uri,
            inspector_token,
            json!({ "payload": { "value": 5.0 }, "submit": true }),
        )
        .await;
    let second = expect_status(second, StatusCode::OK).await;
    assert_eq!(first["data"]["id"], second["data"]["id"]);
    assert_eq!(second["data"]["status"], "submitted");

    let out_of_range = app
        .put_json(&answer_uri, inspector_token, json!({ "payload": { "value": 35.0 } }))
        .await;
    assert_eq!(out_of_range.status(), StatusCode::BAD_REQUEST);

    let listed = app
        .get(&format!("/api/v1/schedules/{id}/checklist"), inspector_token)
        .await;
    let json = expect_status(listed, StatusCode::OK).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["payload"]["value"], 5.0);
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[tokio::test]
async fn report_review_rejection_reaches_the_author() {
    let site = Site::new().await;
    let app = &site.app;
    let (_, drafter_token) = &site.drafter;

    let created = app
        .post_json(
            &format!("/api/v1/projects/{}/reports", site.project_id),
            drafter_token,
            json!({ "file_ref": "s3://slf/reports/draft-1.pdf" }),
        )
        .await;
    let report_id = expect_status(created, StatusCode::CREATED).await["data"]["id"]
        .as_i64()
        .unwrap();

    let submitted = app
        .post_json(
            &format!("/api/v1/reports/{report_id}/transition"),
            drafter_token,
            json!({ "target": "submitted" }),
        )
        .await;
    expect_status(submitted, StatusCode::OK).await;

    let review = app
        .post_json(
            &format!("/api/v1/reports/{report_id}/review"),
            &site.lead,
            json!({ "chain": ["admin_team", "head_consultant"] }),
        )
        .await;
    let json = expect_status(review, StatusCode::OK).await;
    assert_eq!(json["data"]["report"]["status"], "under_review");
    assert_eq!(json["data"]["chain"]["steps"].as_array().unwrap().len(), 2);

    let again = app
        .post_json(&format!("/api/v1/reports/{report_id}/review"), &site.lead, json!({}))
        .await;
    let json = expect_status(again, StatusCode::CONFLICT).await;
    assert_eq!(json["code"], "CHAIN_IN_PROGRESS");

    let decision_uri = format!("/api/v1/reports/{report_id}/decision");
    let early = app
        .post_json(&decision_uri, &site.head, json!({ "decision": "approved" }))
        .await;
    assert_eq!(early.status(), StatusCode::FORBIDDEN);

    let approved = app
        .post_json(&decision_uri, &site.admin_team, json!({ "decision": "approved" }))
        .await;
    let json = expect_status(approved, StatusCode::OK).await;
    assert_eq!(json["data"]["report"]["status"], "under_review");

    let bare = app
        .post_json(&decision_uri, &site.head, json!({ "decision": "rejected" }))
        .await;
    assert_eq!(bare.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let rejected = app
        .post_json(
            &decision_uri,
            &site.head,
            json!({ "decision": "rejected", "notes": "Load calculations missing for level 3" }),
        )
        .await;
    let json = expect_status(rejected, StatusCode::OK).await;
    assert_eq!(json["data"]["report"]["status"], "rejected");
    assert_eq!(json["data"]["chain"]["steps"][0]["decision"], "approved");

    let chains = app
        .get(&format!("/api/v1/reports/{report_id}/chains"), drafter_token)
        .await;
    let json = expect_status(chains, StatusCode::OK).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let inbox = app
        .get("/api/v1/notifications?unread_only=true", drafter_token)
        .await;
    let json = expect_status(inbox, StatusCode::OK).await;
    assert!(json["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["kind"] == "report.rejected"));
}

#[tokio::test]
async fn project_sign_off_runs_through_the_chain() {
    let site = Site::new().await;
    let app = &site.app;
    let (admin_lead_actor, admin_lead) = app.user("adminlead@consult.id", Role::AdminLead).await;

    let current = app.store.get_project(site.project_id).await.unwrap();
    let seeded = ProjectTransition {
        to: ProjectStatus::ReportSubmitted,
        rejected_from: None,
        rejection_notes: None,
        audit: NewTransition::new(
            EntityKind::Project,
            site.project_id,
            current.status,
            ProjectStatus::ReportSubmitted,
            admin_lead_actor,
            None,
        ),
    };
    app.store
        .apply_project_transition(site.project_id, current.version, &seeded)
        .await
        .unwrap();

    let forwarded = app
        .post_json(
            &format!("/api/v1/projects/{}/transition", site.project_id),
            &site.lead,
            json!({ "target": "head_consultant_review" }),
        )
        .await;
    let json = expect_status(forwarded, StatusCode::OK).await;
    assert_eq!(json["data"]["status"], "head_consultant_review");

    let decision_uri = format!("/api/v1/projects/{}/decision", site.project_id);
    let early = app
        .post_json(&decision_uri, &site.head, json!({ "decision": "approved" }))
        .await;
    assert_eq!(early.status(), StatusCode::FORBIDDEN);

    for token in [&site.admin_team, &site.lead, &admin_lead] {
        let step = app
            .post_json(&decision_uri, token, json!({ "decision": "approved" }))
            .await;
        let json = expect_status(step, StatusCode::OK).await;
        assert_eq!(json["data"]["project"]["status"], "head_consultant_review");
    }
    let last = app
        .post_json(&decision_uri, &site.head, json!({ "decision": "approved" }))
        .await;
    let json = expect_status(last, StatusCode::OK).await;
    assert_eq!(json["data"]["project"]["status"], "approved_by_admin_lead");
    assert_eq!(json["data"]["chain"]["status"], "approved");

    let chains = app
        .get(&format!("/api/v1/projects/{}/chains", site.project_id), &site.client)
        .await;
    let json = expect_status(chains, StatusCode::OK).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["steps"].as_array().unwrap().len(), 4);
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mark_read_only_touches_own_notifications() {
    let site = Site::new().await;
    let app = &site.app;
    let (_, drafter_token) = &site.drafter;

    let response = app
        .post_json(
            &format!("/api/v1/projects/{}/documents", site.project_id),
            &site.client,
            json!({
                "category": "land_title",
                "file_ref": "s3://slf/docs/hgb.pdf",
                "file_name": "sertifikat-hgb.pdf",
                "file_format": "pdf",
                "file_size_bytes": 1_048_576,
            }),
        )
        .await;
    let document_id = expect_status(response, StatusCode::CREATED).await["data"]["id"]
        .as_i64()
        .unwrap();
    let verified = app
        .post_json(
            &format!("/api/v1/documents/{document_id}/verify"),
            &site.admin_team,
            json!({ "decision": "approved" }),
        )
        .await;
    expect_status(verified, StatusCode::OK).await;

    let count = app.get("/api/v1/notifications/unread-count", &site.client).await;
    let json = expect_status(count, StatusCode::OK).await;
    assert_eq!(json["data"]["count"], 1);

    let listed = app.get("/api/v1/notifications", &site.client).await;
    let json = expect_status(listed, StatusCode::OK).await;
    let id = json["data"][0]["id"].as_i64().unwrap();
    assert_eq!(json["data"][0]["kind"], "document.verified");

    let foreign = app
        .post_json(&format!("/api/v1/notifications/{id}/read"), drafter_token, json!({}))
        .await;
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);

    let own = app
        .post_json(&format!("/api/v1/notifications/{id}/read"), &site.client, json!({}))
        .await;
    assert_eq!(own.status(), StatusCode::NO_CONTENT);

    let count = app.get("/api/v1/notifications/unread-count", &site.client).await;
    let json = expect_status(count, StatusCode::OK).await;
    assert_eq!(json["data"]["count"], 0);
}

#[tokio::test]
async fn stream_delivers_events_addressed_to_the_caller() {
    let site = Site::new().await;
    let app = &site.app;

    let response = app.get("/api/v1/notifications/stream", &site.client).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );

    let documents = &app.workflow.documents;
    let uploaded = documents
        .upload_document(
            Some(site.project_id),
            UploadDocument {
                category: "land_title".into(),
                file_ref: "s3://slf/docs/hgb.pdf".into(),
                file_name: "sertifikat-hgb.pdf".into(),
                file_format: "pdf".into(),
                file_size_bytes: 1_048_576,
            },
            site.client_actor,
        )
        .await
        .unwrap();
    documents
        .verify_document(
            uploaded.id,
            Decision::Approved,
            None,
            site.admin_actor,
            None,
        )
        .await
        .unwrap();

    let mut body = response.into_body();
    let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
        .await
        .expect("an event within five seconds")
        .expect("stream still open")
        .unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.contains("event: document.verified"), "{text}");
    assert!(text.contains(&format!("\"source_entity_id\":{}", uploaded.id)), "{text}");
}
