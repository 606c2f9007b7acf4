//! Request extractors shared by all handlers.
//!
//! - [`auth::AuthUser`] -- The caller's identity from a JWT Bearer token.

pub mod auth;
