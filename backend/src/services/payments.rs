use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use thiserror::Error;

use crate::auth::Session;
use crate::core::{Context, DbError};
use crate::db;
use crate::db::{Invoice, InvoiceStatus, NewPayment, NotificationType, Payment, PaymentMethod};
use crate::services::audit::{self, DomainAuditEvent};
use crate::services::notify;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<sqlx::Error> for PaymentError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database(error.into())
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub invoice_id: i64,
    pub amount: i64,
    pub method: PaymentMethod,
    pub note: Option<String>,
}

/// The stored payment together with the invoice state right after it.
#[derive(Debug)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub invoice: Invoice,
    pub amount_paid: i64,
}

/// Status an invoice is reported with as of `today`.
///
/// Issued invoices past their due date read as `overdue`; nothing is written.
#[must_use]
pub fn effective_status(status: InvoiceStatus, due_date: NaiveDate, today: NaiveDate) -> InvoiceStatus {
    match status {
        InvoiceStatus::Issued | InvoiceStatus::Overdue if today > due_date => InvoiceStatus::Overdue,
        InvoiceStatus::Overdue => InvoiceStatus::Issued,
        other => other,
    }
}

/// Whether the payments made so far cover the invoice.
#[must_use]
pub const fn settles(amount_paid: i64, total_amount: i64) -> bool {
    amount_paid >= total_amount
}

/// Rejects payments that could never be applied to this invoice.
pub fn check_payable(invoice: &Invoice, amount: i64) -> Result<(), PaymentError> {
    if amount <= 0 {
        return Err(PaymentError::InvalidAmount(amount));
    }
    match invoice.status {
        InvoiceStatus::Draft => Err(PaymentError::Validation(format!("invoice {} has not been issued", invoice.id))),
        InvoiceStatus::Paid => Err(PaymentError::Validation(format!("invoice {} is already paid", invoice.id))),
        InvoiceStatus::Issued | InvoiceStatus::Overdue => Ok(()),
    }
}

/// Appends a payment to an invoice and settles the invoice once fully paid.
///
/// The insert, the re-sum and the status change share one transaction. The insert
/// goes first so the transaction holds the write lock before it reads anything,
/// which serializes concurrent payments on the same invoice.
pub async fn record_payment(
    context: &Context,
    actor: &Session,
    request: PaymentRequest,
    paid_at: NaiveDateTime,
) -> Result<PaymentReceipt, PaymentError> {
    if request.amount <= 0 {
        return Err(PaymentError::InvalidAmount(request.amount));
    }
    let invoice = db::get_invoice_by_id(&context.db, request.invoice_id).await?;
    check_payable(&invoice, request.amount)?;

    let mut tx = context.db.begin().await?;
    let payment = db::insert_payment(
        &mut *tx,
        NewPayment {
            invoice_id: invoice.id,
            amount: request.amount,
            method: request.method,
            note: request.note.filter(|note| !note.trim().is_empty()),
            recorded_by: actor.user_id,
            paid_at,
        },
    )
    .await?;

    let invoice = db::get_invoice_by_id(&mut *tx, invoice.id).await?;
    check_payable(&invoice, payment.amount)?;

    let amount_paid = db::sum_payments(&mut *tx, invoice.id).await?;
    if settles(amount_paid, invoice.total_amount) {
        db::mark_invoice_paid(&mut *tx, invoice.id, paid_at).await?;
    }
    let invoice = db::get_invoice_by_id(&mut *tx, invoice.id).await?;
    tx.commit().await?;

    tracing::info!(
        invoice_id = invoice.id,
        payment_id = payment.id,
        amount = payment.amount,
        amount_paid,
        "Payment recorded"
    );
    audit::log_domain_event(&DomainAuditEvent::PaymentRecorded {
        payment_id: payment.id,
        invoice_id: invoice.id,
        amount: payment.amount,
        amount_paid,
        invoice_status: invoice.status,
        actor_id: actor.user_id,
    });

    let contract = db::get_contract_by_id(&context.db, invoice.contract_id).await?;
    let balance = (invoice.total_amount - amount_paid).max(0);
    notify::notify_tenant(
        &context.db,
        contract.tenant_id,
        NotificationType::PaymentReceived,
        "Payment received",
        format!(
            "We received {} for your {:02}/{} invoice. Remaining balance: {balance}.",
            payment.amount, invoice.month, invoice.year
        ),
    )
    .await;

    Ok(PaymentReceipt {
        payment,
        invoice,
        amount_paid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(status: InvoiceStatus) -> Invoice {
        let created = date(2025, 3, 1).and_hms_opt(9, 0, 0).unwrap();
        Invoice {
            id: 4,
            contract_id: 1,
            month: 3,
            year: 2025,
            rent_amount: 1_000,
            electricity_usage: 0,
            electricity_cost: 0,
            water_usage: 0,
            water_cost: 0,
            internet_usage: 0,
            internet_cost: 0,
            total_amount: 1_000,
            status,
            issue_date: date(2025, 3, 1),
            due_date: date(2025, 3, 11),
            paid_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_issued_invoice_past_due_is_overdue() {
        let due = date(2025, 3, 11);
        assert_eq!(effective_status(InvoiceStatus::Issued, due, date(2025, 3, 12)), InvoiceStatus::Overdue);
        assert_eq!(effective_status(InvoiceStatus::Issued, due, date(2025, 3, 11)), InvoiceStatus::Issued);
        assert_eq!(effective_status(InvoiceStatus::Issued, due, date(2025, 3, 1)), InvoiceStatus::Issued);
    }

    #[test]
    fn test_paid_and_draft_are_never_overdue() {
        let due = date(2025, 3, 11);
        let late = date(2026, 1, 1);
        assert_eq!(effective_status(InvoiceStatus::Paid, due, late), InvoiceStatus::Paid);
        assert_eq!(effective_status(InvoiceStatus::Draft, due, late), InvoiceStatus::Draft);
    }

    #[test]
    fn test_stored_overdue_follows_the_clock() {
        let due = date(2025, 3, 11);
        assert_eq!(effective_status(InvoiceStatus::Overdue, due, date(2025, 4, 1)), InvoiceStatus::Overdue);
        assert_eq!(effective_status(InvoiceStatus::Overdue, due, date(2025, 3, 10)), InvoiceStatus::Issued);
    }

    #[test]
    fn test_settles() {
        assert!(settles(1_000, 1_000));
        assert!(settles(1_200, 1_000));
        assert!(!settles(999, 1_000));
    }

    #[test]
    fn test_non_positive_amounts_are_rejected() {
        let issued = invoice(InvoiceStatus::Issued);
        assert!(matches!(check_payable(&issued, 0), Err(PaymentError::InvalidAmount(0))));
        assert!(matches!(check_payable(&issued, -5), Err(PaymentError::InvalidAmount(-5))));
        assert!(check_payable(&issued, 1).is_ok());
    }

    #[test]
    fn test_draft_and_paid_invoices_do_not_take_payments() {
        assert!(matches!(check_payable(&invoice(InvoiceStatus::Draft), 10), Err(PaymentError::Validation(_))));
        assert!(matches!(check_payable(&invoice(InvoiceStatus::Paid), 10), Err(PaymentError::Validation(_))));
        assert!(check_payable(&invoice(InvoiceStatus::Overdue), 10).is_ok());
    }
}
