use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::auth::Session;
use crate::core;
use crate::db;
use crate::routes::access::require_manager;
use crate::routes::error::ApiError;
use crate::routes::invoices::today;

pub async fn dashboard_statistics(
    State(context): State<core::ArcContext>,
    session: Session,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&session, "read dashboard statistics")?;
    let statistics = db::dashboard_statistics(&context.db, today()).await?;
    Ok(Json(statistics))
}
