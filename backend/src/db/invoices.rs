use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteExecutor};

use crate::core::{DbContext, DbError};
use crate::db::PageRequest;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Issued => "issued",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: i64,
    pub contract_id: i64,
    pub month: i64,
    pub year: i64,
    pub rent_amount: i64,
    pub electricity_usage: i64,
    pub electricity_cost: i64,
    pub water_usage: i64,
    pub water_cost: i64,
    pub internet_usage: i64,
    pub internet_cost: i64,
    pub total_amount: i64,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub paid_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub contract_id: i64,
    pub month: i64,
    pub year: i64,
    pub rent_amount: i64,
    pub electricity_usage: i64,
    pub electricity_cost: i64,
    pub water_usage: i64,
    pub water_cost: i64,
    pub internet_usage: i64,
    pub internet_cost: i64,
    pub total_amount: i64,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// List filter. `status` is matched against the effective status as of `today`,
/// so `overdue` finds issued invoices past their due date.
#[derive(Debug)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub contract_id: Option<i64>,
    pub tenant_id: Option<i64>,
    pub month: Option<i64>,
    pub year: Option<i64>,
    pub today: NaiveDate,
}

/// An invoice together with the sum of the payments recorded against it.
#[derive(Debug, FromRow)]
pub struct InvoiceBalance {
    #[sqlx(flatten)]
    pub invoice: Invoice,
    pub amount_paid: i64,
}

const INVOICE_COLUMNS: &str = "id, contract_id, month, year, rent_amount, electricity_usage, electricity_cost, \
    water_usage, water_cost, internet_usage, internet_cost, total_amount, status, issue_date, due_date, paid_at, \
    created_at, updated_at";

pub async fn create_invoice(db: impl SqliteExecutor<'_>, invoice: NewInvoice) -> Result<Invoice, DbError> {
    let sql = format!(
        r"
        INSERT INTO invoices (contract_id, month, year, rent_amount, electricity_usage, electricity_cost,
                              water_usage, water_cost, internet_usage, internet_cost, total_amount, status,
                              issue_date, due_date, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        RETURNING {INVOICE_COLUMNS}
        "
    );
    let invoice = sqlx::query_as::<_, Invoice>(&sql)
        .bind(invoice.contract_id)
        .bind(invoice.month)
        .bind(invoice.year)
        .bind(invoice.rent_amount)
        .bind(invoice.electricity_usage)
        .bind(invoice.electricity_cost)
        .bind(invoice.water_usage)
        .bind(invoice.water_cost)
        .bind(invoice.internet_usage)
        .bind(invoice.internet_cost)
        .bind(invoice.total_amount)
        .bind(invoice.status)
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .fetch_one(db)
        .await?;
    Ok(invoice)
}

pub async fn get_invoice_by_id(db: impl SqliteExecutor<'_>, id: i64) -> Result<Invoice, DbError> {
    let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?");
    let invoice = sqlx::query_as::<_, Invoice>(&sql).bind(id).fetch_one(db).await?;
    Ok(invoice)
}

pub async fn invoice_exists(db: impl SqliteExecutor<'_>, contract_id: i64, month: i64, year: i64) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM invoices WHERE contract_id = ? AND month = ? AND year = ?)",
    )
    .bind(contract_id)
    .bind(month)
    .bind(year)
    .fetch_one(db)
    .await?;
    Ok(exists)
}

/// Flips the invoice to `paid` unless it already is. Returns whether a row changed.
pub async fn mark_invoice_paid(db: impl SqliteExecutor<'_>, id: i64, paid_at: NaiveDateTime) -> Result<bool, DbError> {
    let result = sqlx::query(
        r"
        UPDATE invoices
        SET status = 'paid', paid_at = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND status != 'paid'
        ",
    )
    .bind(paid_at)
    .bind(id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

fn push_invoice_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &InvoiceFilter) {
    builder.push(" WHERE 1 = 1");
    match filter.status {
        Some(InvoiceStatus::Overdue) => {
            builder
                .push(" AND status IN ('issued', 'overdue') AND due_date < ")
                .push_bind(filter.today);
        }
        Some(InvoiceStatus::Issued) => {
            builder
                .push(" AND status IN ('issued', 'overdue') AND due_date >= ")
                .push_bind(filter.today);
        }
        Some(status) => {
            builder.push(" AND status = ").push_bind(status);
        }
        None => {}
    }
    if let Some(contract_id) = filter.contract_id {
        builder.push(" AND contract_id = ").push_bind(contract_id);
    }
    if let Some(tenant_id) = filter.tenant_id {
        builder
            .push(" AND contract_id IN (SELECT id FROM contracts WHERE tenant_id = ")
            .push_bind(tenant_id)
            .push(")");
    }
    if let Some(month) = filter.month {
        builder.push(" AND month = ").push_bind(month);
    }
    if let Some(year) = filter.year {
        builder.push(" AND year = ").push_bind(year);
    }
}

pub async fn list_invoices(
    db: &DbContext,
    filter: &InvoiceFilter,
    page: PageRequest,
) -> Result<(Vec<InvoiceBalance>, i64), DbError> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM invoices");
    push_invoice_filter(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

    let mut select = QueryBuilder::<Sqlite>::new(format!(
        r"
        SELECT {INVOICE_COLUMNS}, COALESCE(p.paid, 0) AS amount_paid
        FROM invoices
        LEFT JOIN (SELECT invoice_id, SUM(amount) AS paid FROM payments GROUP BY invoice_id) p
            ON p.invoice_id = invoices.id
        "
    ));
    push_invoice_filter(&mut select, filter);
    select
        .push(" ORDER BY year DESC, month DESC, id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let invoices = select.build_query_as::<InvoiceBalance>().fetch_all(db).await?;
    Ok((invoices, total))
}
