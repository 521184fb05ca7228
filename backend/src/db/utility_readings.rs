use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteExecutor};

use crate::core::{DbContext, DbError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UtilityType {
    Electricity,
    Water,
    Internet,
}

impl UtilityType {
    pub const ALL: [Self; 3] = [Self::Electricity, Self::Water, Self::Internet];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Electricity => "electricity",
            Self::Water => "water",
            Self::Internet => "internet",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct UtilityReading {
    pub id: i64,
    pub unit_id: i64,
    pub utility_type: UtilityType,
    pub month: i64,
    pub year: i64,
    pub previous_reading: Option<i64>,
    pub current_reading: i64,
    pub recorded_by: i64,
    pub recorded_at: NaiveDateTime,
}

#[derive(Debug)]
pub struct NewUtilityReading {
    pub unit_id: i64,
    pub utility_type: UtilityType,
    pub month: i64,
    pub year: i64,
    pub previous_reading: Option<i64>,
    pub current_reading: i64,
    pub recorded_by: i64,
}

#[derive(Debug, Default)]
pub struct UtilityReadingFilter {
    pub unit_id: Option<i64>,
    pub month: Option<i64>,
    pub year: Option<i64>,
}

const READING_COLUMNS: &str =
    "id, unit_id, utility_type, month, year, previous_reading, current_reading, recorded_by, recorded_at";

pub async fn create_reading(db: impl SqliteExecutor<'_>, reading: NewUtilityReading) -> Result<UtilityReading, DbError> {
    let sql = format!(
        r"
        INSERT INTO utility_readings (unit_id, utility_type, month, year, previous_reading, current_reading,
                                      recorded_by, recorded_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        RETURNING {READING_COLUMNS}
        "
    );
    let reading = sqlx::query_as::<_, UtilityReading>(&sql)
        .bind(reading.unit_id)
        .bind(reading.utility_type)
        .bind(reading.month)
        .bind(reading.year)
        .bind(reading.previous_reading)
        .bind(reading.current_reading)
        .bind(reading.recorded_by)
        .fetch_one(db)
        .await?;
    Ok(reading)
}

/// Readings recorded for a unit in one billing period, one per utility type.
pub async fn readings_for_period(
    db: impl SqliteExecutor<'_>,
    unit_id: i64,
    month: i64,
    year: i64,
) -> Result<Vec<UtilityReading>, DbError> {
    let sql = format!(
        "SELECT {READING_COLUMNS} FROM utility_readings WHERE unit_id = ? AND month = ? AND year = ? ORDER BY utility_type"
    );
    let readings = sqlx::query_as::<_, UtilityReading>(&sql)
        .bind(unit_id)
        .bind(month)
        .bind(year)
        .fetch_all(db)
        .await?;
    Ok(readings)
}

/// Most recent reading of the same meter strictly before the given period.
pub async fn latest_reading_before(
    db: impl SqliteExecutor<'_>,
    unit_id: i64,
    utility_type: UtilityType,
    month: i64,
    year: i64,
) -> Result<Option<UtilityReading>, DbError> {
    let sql = format!(
        r"
        SELECT {READING_COLUMNS}
        FROM utility_readings
        WHERE unit_id = ? AND utility_type = ? AND (year < ? OR (year = ? AND month < ?))
        ORDER BY year DESC, month DESC
        LIMIT 1
        "
    );
    let reading = sqlx::query_as::<_, UtilityReading>(&sql)
        .bind(unit_id)
        .bind(utility_type)
        .bind(year)
        .bind(year)
        .bind(month)
        .fetch_optional(db)
        .await?;
    Ok(reading)
}

pub async fn list_readings(db: &DbContext, filter: &UtilityReadingFilter) -> Result<Vec<UtilityReading>, DbError> {
    let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {READING_COLUMNS} FROM utility_readings WHERE 1 = 1"));
    if let Some(unit_id) = filter.unit_id {
        select.push(" AND unit_id = ").push_bind(unit_id);
    }
    if let Some(month) = filter.month {
        select.push(" AND month = ").push_bind(month);
    }
    if let Some(year) = filter.year {
        select.push(" AND year = ").push_bind(year);
    }
    select.push(" ORDER BY year DESC, month DESC, unit_id, utility_type");
    let readings = select.build_query_as::<UtilityReading>().fetch_all(db).await?;
    Ok(readings)
}
