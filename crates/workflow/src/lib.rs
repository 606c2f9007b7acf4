//! Workflow services for SLF/PBG certification projects.
//!
//! Every write in the system flows through one of these services, which
//! validate against the rules in `slf_core`, write through an
//! [`EntityStore`] and announce the result through the
//! [`NotificationDispatcher`].

pub mod approval;
pub mod assignment;
pub mod checklist;
mod context;
pub mod documents;
pub mod engine;
pub mod inbox;
pub mod reports;
pub mod retry;
pub mod schedules;
pub mod settings;

use std::sync::Arc;

use slf_db::store::EntityStore;
use slf_events::{EventBus, NotificationDispatcher};

pub use approval::{
    ApprovalCoordinator, DecisionResult, ProjectDecisionResult, ProjectReview, ReviewState,
};
pub use assignment::AssignmentManager;
pub use checklist::ChecklistService;
pub use documents::{DocumentCompleteness, DocumentService, UploadDocument};
pub use engine::{TransitionRequest, WorkflowEngine};
pub use inbox::NotificationInbox;
pub use reports::ReportService;
pub use schedules::ScheduleService;
pub use settings::WorkflowSettings;

use crate::context::Context;

/// All workflow services over one store, bus and configuration.
#[derive(Clone)]
pub struct Workflow {
    pub engine: WorkflowEngine,
    pub approvals: ApprovalCoordinator,
    pub assignments: AssignmentManager,
    pub schedules: ScheduleService,
    pub checklists: ChecklistService,
    pub documents: DocumentService,
    pub reports: ReportService,
    pub inbox: NotificationInbox,
    ctx: Context,
}

impl Workflow {
    pub fn new(
        store: Arc<dyn EntityStore>,
        bus: Arc<EventBus>,
        settings: WorkflowSettings,
    ) -> Self {
        let dispatcher = NotificationDispatcher::new(Arc::clone(&store), bus);
        let ctx = Context::new(store, dispatcher, Arc::new(settings));

        let approvals = ApprovalCoordinator::new(ctx.clone());
        let engine = WorkflowEngine::new(ctx.clone(), approvals.clone());
        Self {
            schedules: ScheduleService::new(ctx.clone(), engine.clone()),
            assignments: AssignmentManager::new(ctx.clone()),
            checklists: ChecklistService::new(ctx.clone()),
            documents: DocumentService::new(ctx.clone()),
            reports: ReportService::new(ctx.clone()),
            inbox: NotificationInbox::new(ctx.clone()),
            engine,
            approvals,
            ctx,
        }
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        self.ctx.store_handle()
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        self.ctx.dispatcher().bus()
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.ctx.settings
    }
}
