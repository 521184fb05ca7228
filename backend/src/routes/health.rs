use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::core;

pub async fn health_check(State(context): State<core::ArcContext>) -> Result<impl IntoResponse, axum::response::Response> {
    sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&context.db).await.map_err(|e| {
        tracing::error!("Health check failed to reach the database: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    })?;

    Ok((StatusCode::OK, "OK").into_response())
}
