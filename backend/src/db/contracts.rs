use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteExecutor};

use crate::core::{DbContext, DbError};
use crate::db::PageRequest;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum ContractStatus {
    Draft,
    Active,
    Expired,
    Terminated,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Contract {
    pub id: i64,
    pub unit_id: i64,
    pub tenant_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rent_amount: i64,
    pub deposit_amount: i64,
    pub status: ContractStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug)]
pub struct NewContract {
    pub unit_id: i64,
    pub tenant_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rent_amount: i64,
    pub deposit_amount: i64,
}

#[derive(Debug, Default)]
pub struct ContractFilter {
    pub status: Option<ContractStatus>,
    pub unit_id: Option<i64>,
    pub tenant_id: Option<i64>,
}

const CONTRACT_COLUMNS: &str = "id, unit_id, tenant_id, start_date, end_date, rent_amount, deposit_amount, \
    status, created_at, updated_at";

pub async fn create_contract(db: impl SqliteExecutor<'_>, new_contract: NewContract) -> Result<Contract, DbError> {
    let sql = format!(
        r"
        INSERT INTO contracts (unit_id, tenant_id, start_date, end_date, rent_amount, deposit_amount,
                               status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 'draft', CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        RETURNING {CONTRACT_COLUMNS}
        "
    );
    let contract = sqlx::query_as::<_, Contract>(&sql)
        .bind(new_contract.unit_id)
        .bind(new_contract.tenant_id)
        .bind(new_contract.start_date)
        .bind(new_contract.end_date)
        .bind(new_contract.rent_amount)
        .bind(new_contract.deposit_amount)
        .fetch_one(db)
        .await?;
    Ok(contract)
}

pub async fn get_contract_by_id(db: impl SqliteExecutor<'_>, id: i64) -> Result<Contract, DbError> {
    let sql = format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = ?");
    let contract = sqlx::query_as::<_, Contract>(&sql).bind(id).fetch_one(db).await?;
    Ok(contract)
}

pub async fn find_active_contract_for_unit(db: impl SqliteExecutor<'_>, unit_id: i64) -> Result<Option<Contract>, DbError> {
    let sql = format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE unit_id = ? AND status = 'active'");
    let contract = sqlx::query_as::<_, Contract>(&sql).bind(unit_id).fetch_optional(db).await?;
    Ok(contract)
}

pub async fn find_active_contract_for_tenant(
    db: impl SqliteExecutor<'_>,
    tenant_id: i64,
) -> Result<Option<Contract>, DbError> {
    let sql = format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE tenant_id = ? AND status = 'active' LIMIT 1");
    let contract = sqlx::query_as::<_, Contract>(&sql).bind(tenant_id).fetch_optional(db).await?;
    Ok(contract)
}

pub async fn set_contract_status(db: impl SqliteExecutor<'_>, id: i64, status: ContractStatus) -> Result<Contract, DbError> {
    let sql = format!(
        r"
        UPDATE contracts
        SET status = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        RETURNING {CONTRACT_COLUMNS}
        "
    );
    let contract = sqlx::query_as::<_, Contract>(&sql).bind(status).bind(id).fetch_one(db).await?;
    Ok(contract)
}

fn push_contract_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ContractFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(unit_id) = filter.unit_id {
        builder.push(" AND unit_id = ").push_bind(unit_id);
    }
    if let Some(tenant_id) = filter.tenant_id {
        builder.push(" AND tenant_id = ").push_bind(tenant_id);
    }
}

pub async fn list_contracts(
    db: &DbContext,
    filter: &ContractFilter,
    page: PageRequest,
) -> Result<(Vec<Contract>, i64), DbError> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM contracts");
    push_contract_filter(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

    let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {CONTRACT_COLUMNS} FROM contracts"));
    push_contract_filter(&mut select, filter);
    select
        .push(" ORDER BY start_date DESC, id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let contracts = select.build_query_as::<Contract>().fetch_all(db).await?;
    Ok((contracts, total))
}
