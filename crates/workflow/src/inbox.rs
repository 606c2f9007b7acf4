//! A user's own notifications.

use slf_core::error::CoreError;
use slf_core::types::{Actor, DbId};
use slf_db::models::notification::Notification;

use crate::context::Context;

#[derive(Clone)]
pub struct NotificationInbox {
    ctx: Context,
}

impl NotificationInbox {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub async fn list(
        &self,
        actor: &Actor,
        unread_only: bool,
    ) -> Result<Vec<Notification>, CoreError> {
        let store = self.ctx.store();
        let user_id = actor.user_id;
        self.ctx
            .retry(move || store.list_notifications(user_id, unread_only))
            .await
    }

    /// Mark one of the actor's notifications read.
    ///
    /// Someone else's notification is reported as missing.
    pub async fn mark_read(&self, id: DbId, actor: &Actor) -> Result<(), CoreError> {
        let store = self.ctx.store();
        let user_id = actor.user_id;
        let changed = self
            .ctx
            .retry(move || store.mark_notification_read(id, user_id))
            .await?;
        if changed {
            return Ok(());
        }
        let owned = self
            .ctx
            .retry(move || store.list_notifications(user_id, false))
            .await?
            .iter()
            .any(|n| n.id == id);
        if owned {
            Ok(())
        } else {
            Err(CoreError::NotFound {
                entity: "notification",
                id,
            })
        }
    }

    pub async fn unread_count(&self, actor: &Actor) -> Result<i64, CoreError> {
        let store = self.ctx.store();
        let user_id = actor.user_id;
        self.ctx.retry(move || store.unread_count(user_id)).await
    }
}
