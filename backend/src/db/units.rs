use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteExecutor};

use crate::core::DbError;
use crate::db::PageRequest;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum RoomType {
    Studio,
    OneBedroom,
    TwoBedroom,
    ThreeBedroom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum UnitStatus {
    Available,
    Occupied,
    Maintenance,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Unit {
    pub id: i64,
    pub unit_number: String,
    pub building: String,
    pub floor: i64,
    pub square_meters: f64,
    pub room_type: RoomType,
    pub rent_price: i64,
    pub deposit_amount: i64,
    pub status: UnitStatus,
    pub amenities: Json<Vec<String>>,
    pub owner_id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Field values written on create and on full update.
#[derive(Debug, Clone)]
pub struct UnitFields {
    pub unit_number: String,
    pub building: String,
    pub floor: i64,
    pub square_meters: f64,
    pub room_type: RoomType,
    pub rent_price: i64,
    pub deposit_amount: i64,
    pub status: UnitStatus,
    pub amenities: Vec<String>,
}

#[derive(Debug, Default)]
pub struct UnitFilter {
    pub status: Option<UnitStatus>,
    pub room_type: Option<RoomType>,
    pub search: Option<String>,
}

const UNIT_COLUMNS: &str = "id, unit_number, building, floor, square_meters, room_type, rent_price, \
    deposit_amount, status, amenities, owner_id, created_at, updated_at";

/// Amenities are a set: trimmed, de-duplicated, sorted.
#[must_use]
pub fn normalize_amenities(amenities: Vec<String>) -> Vec<String> {
    let mut set: Vec<String> = amenities
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    set.sort();
    set.dedup();
    set
}

pub async fn create_unit(db: impl SqliteExecutor<'_>, owner_id: i64, fields: UnitFields) -> Result<Unit, DbError> {
    let sql = format!(
        r"
        INSERT INTO units (unit_number, building, floor, square_meters, room_type, rent_price,
                           deposit_amount, status, amenities, owner_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        RETURNING {UNIT_COLUMNS}
        "
    );
    let unit = sqlx::query_as::<_, Unit>(&sql)
        .bind(fields.unit_number)
        .bind(fields.building)
        .bind(fields.floor)
        .bind(fields.square_meters)
        .bind(fields.room_type)
        .bind(fields.rent_price)
        .bind(fields.deposit_amount)
        .bind(fields.status)
        .bind(Json(normalize_amenities(fields.amenities)))
        .bind(owner_id)
        .fetch_one(db)
        .await?;
    Ok(unit)
}

pub async fn get_unit_by_id(db: impl SqliteExecutor<'_>, id: i64) -> Result<Unit, DbError> {
    let sql = format!("SELECT {UNIT_COLUMNS} FROM units WHERE id = ?");
    let unit = sqlx::query_as::<_, Unit>(&sql).bind(id).fetch_one(db).await?;
    Ok(unit)
}

pub async fn update_unit(db: impl SqliteExecutor<'_>, id: i64, fields: UnitFields) -> Result<Unit, DbError> {
    let sql = format!(
        r"
        UPDATE units
        SET unit_number = ?, building = ?, floor = ?, square_meters = ?, room_type = ?,
            rent_price = ?, deposit_amount = ?, status = ?, amenities = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        RETURNING {UNIT_COLUMNS}
        "
    );
    let unit = sqlx::query_as::<_, Unit>(&sql)
        .bind(fields.unit_number)
        .bind(fields.building)
        .bind(fields.floor)
        .bind(fields.square_meters)
        .bind(fields.room_type)
        .bind(fields.rent_price)
        .bind(fields.deposit_amount)
        .bind(fields.status)
        .bind(Json(normalize_amenities(fields.amenities)))
        .bind(id)
        .fetch_one(db)
        .await?;
    Ok(unit)
}

pub async fn set_unit_status(db: impl SqliteExecutor<'_>, id: i64, status: UnitStatus) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE units SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(status)
        .bind(id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::RowNotFound(sqlx::Error::RowNotFound));
    }
    Ok(())
}

fn push_unit_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &UnitFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(room_type) = filter.room_type {
        builder.push(" AND room_type = ").push_bind(room_type);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        builder
            .push(" AND (unit_number LIKE ")
            .push_bind(pattern.clone())
            .push(" OR building LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list_units(
    db: &crate::core::DbContext,
    filter: &UnitFilter,
    page: PageRequest,
) -> Result<(Vec<Unit>, i64), DbError> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM units");
    push_unit_filter(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

    let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {UNIT_COLUMNS} FROM units"));
    push_unit_filter(&mut select, filter);
    select
        .push(" ORDER BY building, unit_number LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let units = select.build_query_as::<Unit>().fetch_all(db).await?;
    Ok((units, total))
}
