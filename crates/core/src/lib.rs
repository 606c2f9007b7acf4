//! Domain rules for the SLF/PBG certification workflow.
//!
//! This crate has zero internal dependencies so the rules can be shared by
//! the store, the workflow services and the HTTP layer alike.

pub mod access;
pub mod approval;
pub mod assignment;
pub mod checklist;
pub mod documents;
pub mod error;
pub mod geotag;
pub mod roles;
pub mod status;
pub mod types;
pub mod workflow;
