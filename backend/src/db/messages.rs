use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

use crate::core::DbError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    System,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub content: String,
    pub message_type: MessageType,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug)]
pub struct NewMessage {
    pub sender_id: i64,
    pub recipient_id: i64,
    pub content: String,
    pub message_type: MessageType,
}

/// One row per counterpart the user has exchanged messages with.
#[derive(Debug, Serialize, FromRow)]
pub struct ConversationSummary {
    pub counterpart_id: i64,
    pub last_message_at: NaiveDateTime,
    pub message_count: i64,
    pub unread_count: i64,
}

const MESSAGE_COLUMNS: &str = "id, sender_id, recipient_id, content, message_type, is_read, created_at";

pub async fn create_message(db: impl SqliteExecutor<'_>, message: NewMessage) -> Result<Message, DbError> {
    let sql = format!(
        r"
        INSERT INTO messages (sender_id, recipient_id, content, message_type, is_read, created_at)
        VALUES (?, ?, ?, ?, FALSE, CURRENT_TIMESTAMP)
        RETURNING {MESSAGE_COLUMNS}
        "
    );
    let message = sqlx::query_as::<_, Message>(&sql)
        .bind(message.sender_id)
        .bind(message.recipient_id)
        .bind(message.content)
        .bind(message.message_type)
        .fetch_one(db)
        .await?;
    Ok(message)
}

/// Messages between two users in either direction, oldest first.
pub async fn list_conversation(db: impl SqliteExecutor<'_>, user_id: i64, other_id: i64) -> Result<Vec<Message>, DbError> {
    let sql = format!(
        r"
        SELECT {MESSAGE_COLUMNS}
        FROM messages
        WHERE (sender_id = ? AND recipient_id = ?) OR (sender_id = ? AND recipient_id = ?)
        ORDER BY created_at, id
        "
    );
    let messages = sqlx::query_as::<_, Message>(&sql)
        .bind(user_id)
        .bind(other_id)
        .bind(other_id)
        .bind(user_id)
        .fetch_all(db)
        .await?;
    Ok(messages)
}

pub async fn list_conversations(db: impl SqliteExecutor<'_>, user_id: i64) -> Result<Vec<ConversationSummary>, DbError> {
    let summaries = sqlx::query_as::<_, ConversationSummary>(
        r"
        SELECT
            CASE WHEN sender_id = ?1 THEN recipient_id ELSE sender_id END AS counterpart_id,
            MAX(created_at) AS last_message_at,
            COUNT(*) AS message_count,
            SUM(CASE WHEN recipient_id = ?1 AND is_read = FALSE THEN 1 ELSE 0 END) AS unread_count
        FROM messages
        WHERE sender_id = ?1 OR recipient_id = ?1
        GROUP BY counterpart_id
        ORDER BY last_message_at DESC
        ",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(summaries)
}

/// Only the recipient can mark a message read; returns whether a row changed.
pub async fn mark_message_read(db: impl SqliteExecutor<'_>, id: i64, recipient_id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("UPDATE messages SET is_read = TRUE WHERE id = ? AND recipient_id = ?")
        .bind(id)
        .bind(recipient_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
