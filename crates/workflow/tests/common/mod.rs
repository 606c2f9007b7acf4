#![allow(dead_code)]

mod faulty;

use std::sync::Arc;

use chrono::Utc;
use slf_core::roles::Role;
use slf_core::status::{ApplicationType, EntityKind, ProjectStatus, ScheduleType};
use slf_core::types::{Actor, DbId};
use slf_db::models::project::{CreateProject, Project, ProjectTransition};
use slf_db::models::schedule::{CreateSchedule, Schedule};
use slf_db::models::transition::NewTransition;
use slf_db::models::user::CreateUser;
use slf_db::store::{EntityStore, MemoryStore};
use slf_events::EventBus;
use slf_workflow::{Workflow, WorkflowSettings};

pub use faulty::FaultyStore;

/// One user per role, a workflow over a fresh in-memory store.
///
/// The workflow reaches the store through `faults`, so a test can make a
/// single store operation fail while reading state through `store`.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub faults: Arc<FaultyStore>,
    pub workflow: Workflow,
    pub client: Actor,
    pub admin_team: Actor,
    pub admin_lead: Actor,
    pub project_lead: Actor,
    pub inspector: Actor,
    pub drafter: Actor,
    pub head_consultant: Actor,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_settings(WorkflowSettings::default()).await
    }

    pub async fn with_settings(settings: WorkflowSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let faults = Arc::new(FaultyStore::new(store.clone()));
        let workflow = Workflow::new(faults.clone(), Arc::new(EventBus::default()), settings);

        let client = user(&store, "client@pt-maju.co.id", Role::Client).await;
        let admin_team = user(&store, "admin@consult.id", Role::AdminTeam).await;
        let admin_lead = user(&store, "adminlead@consult.id", Role::AdminLead).await;
        let project_lead = user(&store, "lead@consult.id", Role::ProjectLead).await;
        let inspector = user(&store, "inspector@consult.id", Role::Inspector).await;
        let drafter = user(&store, "drafter@consult.id", Role::Drafter).await;
        let head_consultant = user(&store, "head@consult.id", Role::HeadConsultant).await;

        Self {
            store,
            faults,
            workflow,
            client,
            admin_team,
            admin_lead,
            project_lead,
            inspector,
            drafter,
            head_consultant,
        }
    }

    pub fn actor(&self, role: Role) -> Actor {
        match role {
            Role::Client => self.client,
            Role::AdminTeam => self.admin_team,
            Role::AdminLead => self.admin_lead,
            Role::ProjectLead => self.project_lead,
            Role::Inspector => self.inspector,
            Role::Drafter => self.drafter,
            Role::HeadConsultant => self.head_consultant,
        }
    }

    /// A fresh `draft` project led by the harness lead, with the inspector
    /// and drafter on its team.
    pub async fn project(&self) -> Project {
        let project = self
            .workflow
            .engine
            .create_project(
                CreateProject {
                    name: "Ruko Sudirman Blok A".into(),
                    address: "Jl. Sudirman 12".into(),
                    city: "Jakarta".into(),
                    application_type: ApplicationType::Slf,
                    client_id: self.client.user_id,
                    project_lead_id: Some(self.project_lead.user_id),
                    admin_lead_id: Some(self.admin_lead.user_id),
                },
                self.client,
            )
            .await
            .unwrap();
        self.store
            .add_team_member(project.id, self.inspector.user_id)
            .await
            .unwrap();
        self.store
            .add_team_member(project.id, self.drafter.user_id)
            .await
            .unwrap();
        project
    }

    /// Put a project straight into `status`, bypassing the graph.
    pub async fn force_status(
        &self,
        project_id: DbId,
        status: ProjectStatus,
        rejected_from: Option<ProjectStatus>,
    ) -> Project {
        let current = self.store.get_project(project_id).await.unwrap();
        let change = ProjectTransition {
            to: status,
            rejected_from,
            rejection_notes: rejected_from.map(|_| "seeded".to_string()),
            audit: NewTransition::new(
                EntityKind::Project,
                project_id,
                current.status,
                status,
                self.admin_lead,
                None,
            ),
        };
        self.store
            .apply_project_transition(project_id, current.version, &change)
            .await
            .unwrap()
    }

    pub async fn schedule(&self, project_id: DbId, schedule_type: ScheduleType) -> Schedule {
        self.workflow
            .schedules
            .create_schedule(
                CreateSchedule {
                    project_id,
                    schedule_type,
                    scheduled_date: Utc::now(),
                    notes: None,
                    created_by: 0,
                },
                self.project_lead,
            )
            .await
            .unwrap()
    }

    /// An inspection assigned to the harness inspector.
    pub async fn assigned_inspection(&self, project_id: DbId) -> Schedule {
        let schedule = self.schedule(project_id, ScheduleType::Inspection).await;
        self.workflow
            .assignments
            .assign(schedule.id, self.inspector.user_id, self.project_lead, None)
            .await
            .unwrap()
    }

    /// Another user with `role`, not on any team.
    pub async fn outsider(&self, email: &str, role: Role) -> Actor {
        user(&self.store, email, role).await
    }
}

async fn user(store: &MemoryStore, email: &str, role: Role) -> Actor {
    let created = store
        .create_user(&CreateUser {
            name: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_string(),
            role,
        })
        .await
        .unwrap();
    Actor::new(created.id, role)
}
