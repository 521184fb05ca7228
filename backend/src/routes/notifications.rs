use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::auth::Session;
use crate::core;
use crate::db;
use crate::routes::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

pub async fn list_notifications(
    State(context): State<core::ArcContext>,
    session: Session,
    Query(query): Query<NotificationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let notifications = db::list_notifications(&context.db, session.user_id, query.unread_only).await?;
    Ok(Json(notifications))
}

pub async fn mark_notification_read(
    State(context): State<core::ArcContext>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = db::set_notification_read(&context.db, id, session.user_id, true).await?;
    Ok(Json(notification))
}
