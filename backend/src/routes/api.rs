use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde_json::json;

use crate::auth::Session;
use crate::core;
use crate::db;
use crate::routes::error::ApiError;

/// The caller's session and account
pub async fn me(State(context): State<core::ArcContext>, session: Session) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(user_id = session.user_id, "Reading own account");
    let user = db::get_user_by_id(&context.db, session.user_id).await?;
    Ok(Json(json!({
        "user_id": session.user_id,
        "username": session.username,
        "role": session.role,
        "email": user.email,
    })))
}
