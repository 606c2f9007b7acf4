//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Versioned writes return
//! `Ok(None)` when the compare-and-swap on `version` matched no row; the
//! caller decides whether that means missing or stale.

pub mod approval_repo;
pub mod checklist_repo;
pub mod document_repo;
pub mod notification_repo;
pub mod project_repo;
pub mod report_repo;
pub mod schedule_repo;
pub mod team_repo;
pub mod transition_repo;
pub mod user_repo;

pub use approval_repo::ApprovalRepo;
pub use checklist_repo::ChecklistRepo;
pub use document_repo::DocumentRepo;
pub use notification_repo::NotificationRepo;
pub use project_repo::ProjectRepo;
pub use report_repo::ReportRepo;
pub use schedule_repo::ScheduleRepo;
pub use team_repo::TeamRepo;
pub use transition_repo::TransitionRepo;
pub use user_repo::UserRepo;
