use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

use crate::core::{DbContext, DbError};

#[derive(Debug, Serialize, FromRow, PartialEq, Eq)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DashboardStatistics {
    pub units_by_status: Vec<LabelCount>,
    pub active_tenants: i64,
    pub active_contracts: i64,
    pub invoices_by_status: Vec<LabelCount>,
    pub outstanding_amount: i64,
    pub collected_amount: i64,
    pub tickets_by_status: Vec<LabelCount>,
    pub tickets_by_priority: Vec<LabelCount>,
    pub average_resolution_hours: Option<f64>,
}

async fn count_grouped(db: &DbContext, sql: &str) -> Result<Vec<LabelCount>, DbError> {
    let rows = sqlx::query_as::<_, LabelCount>(sql).fetch_all(db).await?;
    Ok(rows)
}

async fn scalar(db: &DbContext, sql: &str) -> Result<i64, DbError> {
    let value = sqlx::query_scalar::<_, i64>(sql).fetch_one(db).await?;
    Ok(value)
}

/// Aggregates for the admin dashboard. Invoice counts use the effective status as of `today`.
pub async fn dashboard_statistics(db: &DbContext, today: NaiveDate) -> Result<DashboardStatistics, DbError> {
    let units_by_status =
        count_grouped(db, "SELECT status AS label, COUNT(*) AS count FROM units GROUP BY status ORDER BY status").await?;
    let active_tenants = scalar(db, "SELECT COUNT(*) FROM tenants WHERE status = 'active'").await?;
    let active_contracts = scalar(db, "SELECT COUNT(*) FROM contracts WHERE status = 'active'").await?;

    let invoices_by_status = sqlx::query_as::<_, LabelCount>(
        r"
        SELECT
            CASE
                WHEN status IN ('issued', 'overdue') AND due_date < ?1 THEN 'overdue'
                WHEN status = 'overdue' THEN 'issued'
                ELSE status
            END AS label,
            COUNT(*) AS count
        FROM invoices
        GROUP BY label
        ORDER BY label
        ",
    )
    .bind(today)
    .fetch_all(db)
    .await?;

    let outstanding_amount = sqlx::query_scalar::<_, i64>(
        r"
        SELECT COALESCE(SUM(i.total_amount - COALESCE(p.paid, 0)), 0)
        FROM invoices i
        LEFT JOIN (SELECT invoice_id, SUM(amount) AS paid FROM payments GROUP BY invoice_id) p
            ON p.invoice_id = i.id
        WHERE i.status IN ('issued', 'overdue')
        ",
    )
    .fetch_one(db)
    .await?;
    let collected_amount = scalar(db, "SELECT COALESCE(SUM(amount), 0) FROM payments").await?;

    let tickets_by_status = count_grouped(
        db,
        "SELECT status AS label, COUNT(*) AS count FROM maintenance_tickets GROUP BY status ORDER BY status",
    )
    .await?;
    let tickets_by_priority = count_grouped(
        db,
        "SELECT priority AS label, COUNT(*) AS count FROM maintenance_tickets GROUP BY priority ORDER BY priority",
    )
    .await?;

    // hours from the creation event to the completion event
    let average_resolution_hours = sqlx::query_scalar::<_, Option<f64>>(
        r"
        SELECT AVG((julianday(done.changed_at) - julianday(t.created_at)) * 24.0)
        FROM maintenance_tickets t
        JOIN ticket_status_events done ON done.ticket_id = t.id AND done.to_status = 'completed'
        ",
    )
    .fetch_one(db)
    .await?;

    Ok(DashboardStatistics {
        units_by_status,
        active_tenants,
        active_contracts,
        invoices_by_status,
        outstanding_amount,
        collected_amount,
        tickets_by_status,
        tickets_by_priority,
        average_resolution_hours,
    })
}
