use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::auth::Session;
use crate::core;
use crate::db;
use crate::db::{NewUtilityReading, UtilityReadingFilter, UtilityType};
use crate::routes::access::require_manager;
use crate::routes::error::ApiError;
use crate::services::invoices::{MAX_BILLING_YEAR, MIN_BILLING_YEAR};

#[derive(Debug, Deserialize)]
pub struct ReadingQuery {
    pub unit_id: Option<i64>,
    pub month: Option<i64>,
    pub year: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReadingBody {
    pub unit_id: i64,
    pub utility_type: UtilityType,
    pub month: i64,
    pub year: i64,
    /// Defaults to the current reading of the latest earlier period
    pub previous_reading: Option<i64>,
    pub current_reading: i64,
}

pub async fn list_readings(
    State(context): State<core::ArcContext>,
    session: Session,
    Query(query): Query<ReadingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&session, "list utility readings")?;
    let filter = UtilityReadingFilter {
        unit_id: query.unit_id,
        month: query.month,
        year: query.year,
    };
    let readings = db::list_readings(&context.db, &filter).await?;
    Ok(Json(readings))
}

pub async fn create_reading(
    State(context): State<core::ArcContext>,
    session: Session,
    Json(body): Json<ReadingBody>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&session, "record utility reading")?;
    if !(1..=12).contains(&body.month) || !(MIN_BILLING_YEAR..=MAX_BILLING_YEAR).contains(&body.year) {
        return Err(ApiError::Validation(format!("invalid period {}/{}", body.month, body.year)));
    }
    db::get_unit_by_id(&context.db, body.unit_id).await?;

    let previous_reading = match body.previous_reading {
        Some(previous) => Some(previous),
        None => db::latest_reading_before(&context.db, body.unit_id, body.utility_type, body.month, body.year)
            .await?
            .map(|reading| reading.current_reading),
    };
    let kind = body.utility_type.as_str();
    if body.current_reading < 0 || previous_reading.is_some_and(|p| p < 0) {
        return Err(ApiError::InvalidReading(format!("{kind} readings cannot be negative")));
    }
    if previous_reading.is_some_and(|p| body.current_reading < p) {
        return Err(ApiError::InvalidReading(format!("{kind} reading is lower than the previous reading")));
    }

    let reading = db::create_reading(
        &context.db,
        NewUtilityReading {
            unit_id: body.unit_id,
            utility_type: body.utility_type,
            month: body.month,
            year: body.year,
            previous_reading,
            current_reading: body.current_reading,
            recorded_by: session.user_id,
        },
    )
    .await?;
    tracing::info!(unit_id = reading.unit_id, reading_id = reading.id, utility = kind, "Utility reading recorded");
    Ok((StatusCode::CREATED, Json(reading)))
}
