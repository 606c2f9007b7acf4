//! Fan-out of workflow events to users.
//!
//! Notification delivery never blocks or fails a workflow write: each
//! notification row is created independently and failures are logged and
//! dropped.

use std::collections::BTreeSet;
use std::sync::Arc;

use slf_core::roles::Role;
use slf_core::status::EntityKind;
use slf_core::types::{Actor, DbId};
use slf_db::models::notification::NewNotification;
use slf_db::store::EntityStore;

use crate::bus::{EventBus, PlatformEvent};

/// Event names used for notifications and bus events.
pub mod kinds {
    pub const PROJECT_TRANSITIONED: &str = "project.transitioned";
    pub const PROJECT_REJECTED: &str = "project.rejected";
    pub const DOCUMENT_VERIFIED: &str = "document.verified";
    pub const DOCUMENT_REJECTED: &str = "document.rejected";
    pub const SCHEDULE_ASSIGNED: &str = "schedule.assigned";
    pub const INSPECTION_STARTED: &str = "inspection.started";
    pub const INSPECTION_COMPLETED: &str = "inspection.completed";
    pub const SCHEDULE_CANCELLED: &str = "schedule.cancelled";
    pub const REPORT_TRANSITIONED: &str = "report.transitioned";
    pub const REVIEW_STEP_PENDING: &str = "review.step_pending";
    pub const REPORT_APPROVED: &str = "report.approved";
    pub const REPORT_REJECTED: &str = "report.rejected";
}

/// Who should hear about an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    User(DbId),
    /// Every user holding the role.
    Role(Role),
}

/// A state change worth telling people about.
#[derive(Debug, Clone)]
pub struct WorkflowEvent {
    pub kind: &'static str,
    pub entity_type: EntityKind,
    pub entity_id: DbId,
    pub actor: Option<Actor>,
    pub recipients: Vec<Recipient>,
    pub message: String,
    pub payload: serde_json::Value,
}

impl WorkflowEvent {
    pub fn new(
        kind: &'static str,
        entity_type: EntityKind,
        entity_id: DbId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            entity_type,
            entity_id,
            actor: None,
            recipients: Vec::new(),
            message: message.into(),
            payload: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn by(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn to(mut self, recipient: Recipient) -> Self {
        self.recipients.push(recipient);
        self
    }

    /// Add a user recipient when one is known.
    pub fn to_user(self, user_id: Option<DbId>) -> Self {
        match user_id {
            Some(id) => self.to(Recipient::User(id)),
            None => self,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Resolves recipients, stores notifications and publishes to the bus.
#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn EntityStore>,
    bus: Arc<EventBus>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn EntityStore>, bus: Arc<EventBus>) -> Self {
        Self { store, bus }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Deliver `event` to every resolved recipient except its sender.
    ///
    /// Returns how many notifications were stored.
    pub async fn notify(&self, event: WorkflowEvent) -> usize {
        let sender = event.actor.map(|a| a.user_id);
        let recipients = self.resolve(&event.recipients, sender).await;

        let mut delivered = Vec::with_capacity(recipients.len());
        for recipient_id in recipients {
            let input = NewNotification {
                recipient_id,
                sender_id: sender,
                kind: event.kind.to_string(),
                message: event.message.clone(),
                entity_type: Some(event.entity_type),
                entity_id: Some(event.entity_id),
            };
            match self.store.create_notification(&input).await {
                Ok(_) => delivered.push(recipient_id),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        recipient_id,
                        kind = event.kind,
                        entity_id = event.entity_id,
                        "Failed to store notification"
                    );
                }
            }
        }

        let count = delivered.len();
        let mut published = PlatformEvent::new(event.kind)
            .with_source(event.entity_type, event.entity_id)
            .with_recipients(delivered)
            .with_message(event.message)
            .with_payload(event.payload);
        if let Some(sender) = sender {
            published = published.with_actor(sender);
        }
        self.bus.publish(published);

        tracing::debug!(kind = event.kind, count, "Notifications dispatched");
        count
    }

    async fn resolve(&self, recipients: &[Recipient], sender: Option<DbId>) -> BTreeSet<DbId> {
        let mut ids = BTreeSet::new();
        for recipient in recipients {
            match recipient {
                Recipient::User(id) => {
                    ids.insert(*id);
                }
                Recipient::Role(role) => match self.store.list_users_by_role(*role).await {
                    Ok(users) => ids.extend(users.into_iter().map(|u| u.id)),
                    Err(e) => {
                        tracing::warn!(error = %e, role = %role, "Failed to resolve role recipients");
                    }
                },
            }
        }
        if let Some(sender) = sender {
            ids.remove(&sender);
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use slf_db::models::user::CreateUser;
    use slf_db::store::MemoryStore;

    use super::*;

    async fn user(store: &MemoryStore, email: &str, role: Role) -> DbId {
        store
            .create_user(&CreateUser {
                name: email.into(),
                email: email.into(),
                role,
            })
            .await
            .unwrap()
            .id
    }

    fn dispatcher(store: Arc<MemoryStore>) -> NotificationDispatcher {
        NotificationDispatcher::new(store, Arc::new(EventBus::default()))
    }

    #[tokio::test]
    async fn role_recipients_resolve_and_sender_is_excluded() {
        let store = Arc::new(MemoryStore::new());
        let a = user(&store, "a@x.id", Role::AdminTeam).await;
        let b = user(&store, "b@x.id", Role::AdminTeam).await;
        let d = dispatcher(store.clone());

        let event = WorkflowEvent::new(kinds::PROJECT_TRANSITIONED, EntityKind::Project, 1, "moved")
            .by(Actor::new(a, Role::AdminTeam))
            .to(Recipient::Role(Role::AdminTeam));

        assert_eq!(d.notify(event).await, 1);
        assert_eq!(store.unread_count(a).await.unwrap(), 0);
        assert_eq!(store.unread_count(b).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_recipients_get_one_notification() {
        let store = Arc::new(MemoryStore::new());
        let lead = user(&store, "lead@x.id", Role::ProjectLead).await;
        let d = dispatcher(store.clone());

        let event = WorkflowEvent::new(kinds::REPORT_REJECTED, EntityKind::Report, 9, "rejected")
            .to(Recipient::User(lead))
            .to(Recipient::Role(Role::ProjectLead));

        assert_eq!(d.notify(event).await, 1);
    }

    #[tokio::test]
    async fn store_failures_are_swallowed_and_event_still_published() {
        let store = Arc::new(MemoryStore::new());
        let real = user(&store, "ok@x.id", Role::Drafter).await;
        let d = dispatcher(store.clone());
        let mut rx = d.bus().subscribe();

        let event = WorkflowEvent::new(kinds::SCHEDULE_ASSIGNED, EntityKind::Schedule, 3, "assigned")
            .to(Recipient::User(real))
            .to(Recipient::User(9_999));

        assert_eq!(d.notify(event).await, 1);
        let published = rx.recv().await.unwrap();
        assert_eq!(published.recipients, vec![real]);
        assert_eq!(published.message, "assigned");
    }
}
