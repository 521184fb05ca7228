use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

use crate::core::DbError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    EWallet,
    Other,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub invoice_id: i64,
    pub amount: i64,
    pub method: PaymentMethod,
    pub note: Option<String>,
    pub recorded_by: i64,
    pub paid_at: NaiveDateTime,
}

#[derive(Debug)]
pub struct NewPayment {
    pub invoice_id: i64,
    pub amount: i64,
    pub method: PaymentMethod,
    pub note: Option<String>,
    pub recorded_by: i64,
    pub paid_at: NaiveDateTime,
}

const PAYMENT_COLUMNS: &str = "id, invoice_id, amount, method, note, recorded_by, paid_at";

pub async fn insert_payment(db: impl SqliteExecutor<'_>, payment: NewPayment) -> Result<Payment, DbError> {
    let sql = format!(
        r"
        INSERT INTO payments (invoice_id, amount, method, note, recorded_by, paid_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING {PAYMENT_COLUMNS}
        "
    );
    let payment = sqlx::query_as::<_, Payment>(&sql)
        .bind(payment.invoice_id)
        .bind(payment.amount)
        .bind(payment.method)
        .bind(payment.note)
        .bind(payment.recorded_by)
        .bind(payment.paid_at)
        .fetch_one(db)
        .await?;
    Ok(payment)
}

pub async fn sum_payments(db: impl SqliteExecutor<'_>, invoice_id: i64) -> Result<i64, DbError> {
    let sum = sqlx::query_scalar::<_, i64>("SELECT COALESCE(SUM(amount), 0) FROM payments WHERE invoice_id = ?")
        .bind(invoice_id)
        .fetch_one(db)
        .await?;
    Ok(sum)
}

pub async fn list_payments_for_invoice(db: impl SqliteExecutor<'_>, invoice_id: i64) -> Result<Vec<Payment>, DbError> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = ? ORDER BY paid_at, id");
    let payments = sqlx::query_as::<_, Payment>(&sql).bind(invoice_id).fetch_all(db).await?;
    Ok(payments)
}
