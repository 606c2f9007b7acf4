//! Inspection reports and their findings.

use slf_core::error::CoreError;
use slf_core::roles::Role;
use slf_core::status::{ReportStatus, ScheduleType};
use slf_core::types::{Actor, DbId};
use slf_db::models::report::{CreateReport, Report};

use crate::context::{check_version, require_role, Context};

const REPORT_AUTHORS: &[Role] = &[Role::Drafter, Role::Inspector, Role::ProjectLead];

#[derive(Clone)]
pub struct ReportService {
    ctx: Context,
}

impl ReportService {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Create a `draft` report, optionally tied to one inspection.
    pub async fn create_report(
        &self,
        mut input: CreateReport,
        actor: Actor,
    ) -> Result<Report, CoreError> {
        require_role(&actor, REPORT_AUTHORS, "write reports")?;
        let project = self.ctx.visible_project(input.project_id, &actor).await?;

        let store = self.ctx.store();
        if let Some(schedule_id) = input.schedule_id {
            let schedule = self.ctx.retry(move || store.get_schedule(schedule_id)).await?;
            if schedule.project_id != project.id {
                return Err(CoreError::Validation(format!(
                    "Schedule {schedule_id} does not belong to project {}",
                    project.id
                )));
            }
            if schedule.schedule_type != ScheduleType::Inspection {
                return Err(CoreError::Validation(format!(
                    "Schedule {schedule_id} is a {}, not an inspection",
                    schedule.schedule_type
                )));
            }
        }

        input.author_id = actor.user_id;
        let input = &input;
        let report = self.ctx.retry(move || store.create_report(input)).await?;

        tracing::info!(
            report_id = report.id,
            project_id = report.project_id,
            schedule_id = ?report.schedule_id,
            author_id = report.author_id,
            "Report created"
        );
        Ok(report)
    }

    pub async fn get_report(&self, id: DbId, actor: &Actor) -> Result<Report, CoreError> {
        let store = self.ctx.store();
        let report = self.ctx.retry(move || store.get_report(id)).await?;
        self.ctx.visible_project(report.project_id, actor).await?;
        Ok(report)
    }

    pub async fn list_reports(
        &self,
        project_id: DbId,
        actor: &Actor,
    ) -> Result<Vec<Report>, CoreError> {
        self.ctx.visible_project(project_id, actor).await?;
        let store = self.ctx.store();
        self.ctx.retry(move || store.list_reports(project_id)).await
    }

    /// Replace the findings cited by a draft report.
    ///
    /// Every finding must be a checklist response of the report's
    /// inspection. Duplicates are dropped, order is kept.
    pub async fn select_findings(
        &self,
        report_id: DbId,
        findings: Vec<DbId>,
        actor: Actor,
        expected_version: Option<i32>,
    ) -> Result<Report, CoreError> {
        let report = self.get_report(report_id, &actor).await?;
        let expected = check_version("report", report_id, report.version, expected_version)?;
        if report.author_id != actor.user_id && actor.role != Role::ProjectLead {
            return Err(CoreError::Forbidden(format!(
                "Only the author or the project lead may edit report {report_id}"
            )));
        }
        if report.status != ReportStatus::Draft {
            return Err(CoreError::Conflict(format!(
                "Findings can only change while report {report_id} is a draft (it is {})",
                report.status
            )));
        }

        let mut selected: Vec<DbId> = Vec::with_capacity(findings.len());
        for id in findings {
            if !selected.contains(&id) {
                selected.push(id);
            }
        }

        let store = self.ctx.store();
        if !selected.is_empty() {
            let schedule_id = report.schedule_id.ok_or_else(|| {
                CoreError::Validation(format!(
                    "Report {report_id} is not tied to an inspection and cannot cite findings"
                ))
            })?;
            let responses = self
                .ctx
                .retry(move || store.list_checklist_responses(schedule_id))
                .await?;
            if let Some(stray) = selected
                .iter()
                .find(|id| !responses.iter().any(|r| r.id == **id))
            {
                return Err(CoreError::Validation(format!(
                    "Finding {stray} is not a checklist response of schedule {schedule_id}"
                )));
            }
        }

        let selected = selected.as_slice();
        let updated = self
            .ctx
            .retry(move || store.set_report_findings(report_id, expected, selected))
            .await?;

        tracing::info!(
            report_id,
            findings = updated.findings.len(),
            actor_id = actor.user_id,
            "Report findings selected"
        );
        Ok(updated)
    }
}
