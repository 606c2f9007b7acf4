//! Workflow notifications and the live event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`, feeding live subscribers.
//! - [`PlatformEvent`]: the envelope published on the bus.
//! - [`NotificationDispatcher`]: turns a [`WorkflowEvent`] into stored
//!   notifications for each resolved recipient, then publishes it.

pub mod bus;
pub mod dispatcher;

pub use bus::{EventBus, PlatformEvent};
pub use dispatcher::{kinds, NotificationDispatcher, Recipient, WorkflowEvent};
