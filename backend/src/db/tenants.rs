use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteExecutor};

use crate::core::{DbContext, DbError};
use crate::db::PageRequest;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum TenantStatus {
    Active,
    Inactive,
    MovedOut,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: i64,
    pub user_id: i64,
    pub full_name: String,
    pub identity_card: String,
    pub phone: String,
    pub current_unit_id: Option<i64>,
    pub move_in_date: Option<NaiveDate>,
    pub status: TenantStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct TenantFields {
    pub full_name: String,
    pub identity_card: String,
    pub phone: String,
    pub status: TenantStatus,
}

#[derive(Debug, Default)]
pub struct TenantFilter {
    pub status: Option<TenantStatus>,
    pub search: Option<String>,
}

const TENANT_COLUMNS: &str = "id, user_id, full_name, identity_card, phone, current_unit_id, move_in_date, \
    status, created_at, updated_at";

pub async fn create_tenant(db: impl SqliteExecutor<'_>, user_id: i64, fields: TenantFields) -> Result<Tenant, DbError> {
    let sql = format!(
        r"
        INSERT INTO tenants (user_id, full_name, identity_card, phone, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        RETURNING {TENANT_COLUMNS}
        "
    );
    let tenant = sqlx::query_as::<_, Tenant>(&sql)
        .bind(user_id)
        .bind(fields.full_name)
        .bind(fields.identity_card)
        .bind(fields.phone)
        .bind(fields.status)
        .fetch_one(db)
        .await?;
    Ok(tenant)
}

pub async fn get_tenant_by_id(db: impl SqliteExecutor<'_>, id: i64) -> Result<Tenant, DbError> {
    let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = ?");
    let tenant = sqlx::query_as::<_, Tenant>(&sql).bind(id).fetch_one(db).await?;
    Ok(tenant)
}

pub async fn get_tenant_by_user_id(db: impl SqliteExecutor<'_>, user_id: i64) -> Result<Tenant, DbError> {
    let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE user_id = ?");
    let tenant = sqlx::query_as::<_, Tenant>(&sql).bind(user_id).fetch_one(db).await?;
    Ok(tenant)
}

pub async fn update_tenant(db: impl SqliteExecutor<'_>, id: i64, fields: TenantFields) -> Result<Tenant, DbError> {
    let sql = format!(
        r"
        UPDATE tenants
        SET full_name = ?, identity_card = ?, phone = ?, status = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        RETURNING {TENANT_COLUMNS}
        "
    );
    let tenant = sqlx::query_as::<_, Tenant>(&sql)
        .bind(fields.full_name)
        .bind(fields.identity_card)
        .bind(fields.phone)
        .bind(fields.status)
        .bind(id)
        .fetch_one(db)
        .await?;
    Ok(tenant)
}

/// Points the tenant at the unit they live in (or clears it on move-out).
pub async fn set_tenant_residence(
    db: impl SqliteExecutor<'_>,
    id: i64,
    unit_id: Option<i64>,
    move_in_date: Option<NaiveDate>,
    status: TenantStatus,
) -> Result<(), DbError> {
    sqlx::query(
        r"
        UPDATE tenants
        SET current_unit_id = ?, move_in_date = ?, status = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        ",
    )
    .bind(unit_id)
    .bind(move_in_date)
    .bind(status)
    .bind(id)
    .execute(db)
    .await?;
    Ok(())
}

/// Moves the tenant out of `unit_id`. A tenant who already lives elsewhere is left untouched.
pub async fn release_tenant_residence(db: impl SqliteExecutor<'_>, id: i64, unit_id: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        r"
        UPDATE tenants
        SET current_unit_id = NULL, move_in_date = NULL, status = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND current_unit_id = ?
        ",
    )
    .bind(TenantStatus::MovedOut)
    .bind(id)
    .bind(unit_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

fn push_tenant_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &TenantFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        builder
            .push(" AND (full_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR phone LIKE ")
            .push_bind(pattern.clone())
            .push(" OR identity_card LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list_tenants(
    db: &DbContext,
    filter: &TenantFilter,
    page: PageRequest,
) -> Result<(Vec<Tenant>, i64), DbError> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM tenants");
    push_tenant_filter(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

    let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {TENANT_COLUMNS} FROM tenants"));
    push_tenant_filter(&mut select, filter);
    select
        .push(" ORDER BY full_name LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let tenants = select.build_query_as::<Tenant>().fetch_all(db).await?;
    Ok((tenants, total))
}
