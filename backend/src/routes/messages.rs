use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;

use crate::auth::Session;
use crate::core;
use crate::db;
use crate::db::{MessageType, NewMessage, NotificationType};
use crate::routes::error::ApiError;
use crate::services::notify;

pub const MAX_MESSAGE_LENGTH: usize = 4_000;

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub recipient_id: i64,
    pub content: String,
}

pub async fn send_message(
    State(context): State<core::ArcContext>,
    session: Session,
    Json(body): Json<MessageBody>,
) -> Result<impl IntoResponse, ApiError> {
    let content = body.content.trim().to_string();
    if content.is_empty() || content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ApiError::Validation(format!(
            "content must be between 1 and {MAX_MESSAGE_LENGTH} characters"
        )));
    }
    if body.recipient_id == session.user_id {
        return Err(ApiError::Validation("cannot send a message to yourself".to_string()));
    }
    let recipient = db::get_user_by_id(&context.db, body.recipient_id).await?;
    // Tenants talk to the management, not to each other
    if !session.is_manager() && !recipient.role.is_manager() {
        return Err(ApiError::forbidden());
    }

    let message = db::create_message(
        &context.db,
        NewMessage {
            sender_id: session.user_id,
            recipient_id: recipient.id,
            content,
            message_type: MessageType::Text,
        },
    )
    .await?;
    tracing::debug!(message_id = message.id, sender_id = session.user_id, recipient_id = recipient.id, "Message sent");

    notify::notify(
        &context.db,
        recipient.id,
        NotificationType::MessageReceived,
        "New message",
        format!("{} sent you a message.", session.username),
    )
    .await;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_conversations(
    State(context): State<core::ArcContext>,
    session: Session,
) -> Result<impl IntoResponse, ApiError> {
    let conversations = db::list_conversations(&context.db, session.user_id).await?;
    Ok(Json(conversations))
}

pub async fn get_conversation(
    State(context): State<core::ArcContext>,
    session: Session,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = db::list_conversation(&context.db, session.user_id, user_id).await?;
    Ok(Json(messages))
}

pub async fn mark_message_read(
    State(context): State<core::ArcContext>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if !db::mark_message_read(&context.db, id, session.user_id).await? {
        return Err(ApiError::NotFound(format!("Message {id} not found")));
    }
    Ok(Json(json!({"result": "ok"})))
}
