use crate::core::DbContext;
use crate::db;
use crate::db::{NewNotification, NotificationType};

/// Delivers an in-app notification. Delivery is best effort: the operation that
/// triggered it has already been committed, so a failure here is only logged.
pub async fn notify(db: &DbContext, recipient_id: i64, notification_type: NotificationType, title: &str, message: String) {
    let notification = NewNotification {
        recipient_id,
        notification_type,
        title: title.to_string(),
        message,
    };
    if let Err(e) = db::create_notification(db, notification).await {
        tracing::warn!(recipient_id, ?notification_type, "Failed to deliver notification: {}", e);
    }
}

/// Notifies every admin and staff account.
pub async fn notify_managers(db: &DbContext, notification_type: NotificationType, title: &str, message: String) {
    match db::list_manager_ids(db).await {
        Ok(ids) => {
            for id in ids {
                notify(db, id, notification_type, title, message.clone()).await;
            }
        }
        Err(e) => tracing::warn!(?notification_type, "Failed to look up notification recipients: {}", e),
    }
}

/// Notifies the user account behind a tenant record.
pub async fn notify_tenant(db: &DbContext, tenant_id: i64, notification_type: NotificationType, title: &str, message: String) {
    match db::get_tenant_by_id(db, tenant_id).await {
        Ok(tenant) => notify(db, tenant.user_id, notification_type, title, message).await,
        Err(e) => tracing::warn!(tenant_id, ?notification_type, "Failed to look up tenant for notification: {}", e),
    }
}
