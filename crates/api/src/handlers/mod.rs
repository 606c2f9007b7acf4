pub mod checklist;
pub mod document;
pub mod inspection;
pub mod notification;
pub mod project;
pub mod report;
pub mod schedule;
