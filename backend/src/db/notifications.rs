use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

use crate::core::DbError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum NotificationType {
    InvoiceIssued,
    PaymentReceived,
    TicketCreated,
    TicketStatusChanged,
    ContractActivated,
    MessageReceived,
    General,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: i64,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub sent_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: i64,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
}

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, notification_type, title, message, is_read, sent_at";

pub async fn create_notification(db: impl SqliteExecutor<'_>, notification: NewNotification) -> Result<Notification, DbError> {
    let sql = format!(
        r"
        INSERT INTO notifications (recipient_id, notification_type, title, message, is_read, sent_at)
        VALUES (?, ?, ?, ?, FALSE, CURRENT_TIMESTAMP)
        RETURNING {NOTIFICATION_COLUMNS}
        "
    );
    let notification = sqlx::query_as::<_, Notification>(&sql)
        .bind(notification.recipient_id)
        .bind(notification.notification_type)
        .bind(notification.title)
        .bind(notification.message)
        .fetch_one(db)
        .await?;
    Ok(notification)
}

pub async fn list_notifications(
    db: impl SqliteExecutor<'_>,
    recipient_id: i64,
    unread_only: bool,
) -> Result<Vec<Notification>, DbError> {
    let sql = format!(
        r"
        SELECT {NOTIFICATION_COLUMNS}
        FROM notifications
        WHERE recipient_id = ? AND (? = FALSE OR is_read = FALSE)
        ORDER BY sent_at DESC, id DESC
        "
    );
    let notifications = sqlx::query_as::<_, Notification>(&sql)
        .bind(recipient_id)
        .bind(unread_only)
        .fetch_all(db)
        .await?;
    Ok(notifications)
}

/// Toggles the read flag; nothing else on a notification is mutable.
pub async fn set_notification_read(
    db: impl SqliteExecutor<'_>,
    id: i64,
    recipient_id: i64,
    is_read: bool,
) -> Result<Notification, DbError> {
    let sql = format!(
        r"
        UPDATE notifications
        SET is_read = ?
        WHERE id = ? AND recipient_id = ?
        RETURNING {NOTIFICATION_COLUMNS}
        "
    );
    let notification = sqlx::query_as::<_, Notification>(&sql)
        .bind(is_read)
        .bind(id)
        .bind(recipient_id)
        .fetch_one(db)
        .await?;
    Ok(notification)
}
