use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::auth::Session;
use crate::core;
use crate::db;
use crate::db::{Page, PageRequest, RoomType, UnitFields, UnitFilter, UnitStatus};
use crate::routes::access::require_manager;
use crate::routes::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct UnitQuery {
    pub status: Option<UnitStatus>,
    pub room_type: Option<RoomType>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UnitBody {
    pub unit_number: String,
    pub building: String,
    pub floor: i64,
    pub square_meters: f64,
    pub room_type: RoomType,
    pub rent_price: i64,
    pub deposit_amount: i64,
    pub status: Option<UnitStatus>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

impl TryFrom<UnitBody> for UnitFields {
    type Error = ApiError;

    fn try_from(body: UnitBody) -> Result<Self, Self::Error> {
        let unit_number = body.unit_number.trim().to_string();
        let building = body.building.trim().to_string();
        if unit_number.is_empty() || building.is_empty() {
            return Err(ApiError::Validation("unit_number and building are required".to_string()));
        }
        if !body.square_meters.is_finite() || body.square_meters <= 0.0 {
            return Err(ApiError::Validation("square_meters must be positive".to_string()));
        }
        if body.rent_price < 0 || body.deposit_amount < 0 {
            return Err(ApiError::Validation("rent_price and deposit_amount cannot be negative".to_string()));
        }
        Ok(Self {
            unit_number,
            building,
            floor: body.floor,
            square_meters: body.square_meters,
            room_type: body.room_type,
            rent_price: body.rent_price,
            deposit_amount: body.deposit_amount,
            status: body.status.unwrap_or(UnitStatus::Available),
            amenities: body.amenities,
        })
    }
}

pub async fn list_units(
    State(context): State<core::ArcContext>,
    _session: Session,
    Query(query): Query<UnitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::new(query.page, query.limit);
    let filter = UnitFilter {
        status: query.status,
        room_type: query.room_type,
        search: query.search,
    };
    let (units, total) = db::list_units(&context.db, &filter, page).await?;
    Ok(Json(Page::new(units, total, page)))
}

pub async fn get_unit(
    State(context): State<core::ArcContext>,
    _session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let unit = db::get_unit_by_id(&context.db, id).await?;
    Ok(Json(unit))
}

pub async fn create_unit(
    State(context): State<core::ArcContext>,
    session: Session,
    Json(body): Json<UnitBody>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&session, "create unit")?;
    let fields = UnitFields::try_from(body)?;
    let unit = db::create_unit(&context.db, session.user_id, fields).await?;
    tracing::info!(unit_id = unit.id, unit_number = unit.unit_number, "Unit created");
    Ok((StatusCode::CREATED, Json(unit)))
}

pub async fn update_unit(
    State(context): State<core::ArcContext>,
    session: Session,
    Path(id): Path<i64>,
    Json(body): Json<UnitBody>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&session, "update unit")?;
    let fields = UnitFields::try_from(body)?;
    let occupied = db::find_active_contract_for_unit(&context.db, id).await?.is_some();
    if occupied && fields.status != UnitStatus::Occupied {
        return Err(ApiError::Validation("a unit under an active contract must stay occupied".to_string()));
    }
    let unit = db::update_unit(&context.db, id, fields).await?;
    tracing::info!(unit_id = unit.id, "Unit updated");
    Ok(Json(unit))
}

/// Takes a unit off the market; units are never physically removed.
pub async fn delete_unit(
    State(context): State<core::ArcContext>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&session, "delete unit")?;
    if db::find_active_contract_for_unit(&context.db, id).await?.is_some() {
        return Err(ApiError::Validation("a unit under an active contract cannot be removed".to_string()));
    }
    db::set_unit_status(&context.db, id, UnitStatus::Maintenance).await?;
    tracing::info!(unit_id = id, "Unit moved to maintenance");
    Ok(Json(serde_json::json!({"result": "ok"})))
}
