use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::core;
use crate::db;
use crate::db::{Invoice, InvoiceFilter, InvoiceStatus, Page, PageRequest, Payment};
use crate::routes::access::{ensure_in_scope, require_manager, tenant_scope};
use crate::routes::error::ApiError;
use crate::services::invoices::{self, MeterReading};
use crate::services::payments::effective_status;

#[derive(Debug, Deserialize)]
pub struct InvoiceQuery {
    pub status: Option<InvoiceStatus>,
    pub contract_id: Option<i64>,
    pub month: Option<i64>,
    pub year: Option<i64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateInvoiceBody {
    pub contract_id: i64,
    pub month: i64,
    pub year: i64,
    /// Falls back to the readings stored for the unit and period
    pub readings: Option<Vec<MeterReading>>,
}

/// An invoice as reported to clients: `status` is the effective status.
#[derive(Debug, Serialize)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub stored_status: InvoiceStatus,
    pub amount_paid: i64,
    pub balance: i64,
}

impl InvoiceView {
    #[must_use]
    pub fn new(mut invoice: Invoice, amount_paid: i64, today: NaiveDate) -> Self {
        let stored_status = invoice.status;
        invoice.status = effective_status(stored_status, invoice.due_date, today);
        let balance = (invoice.total_amount - amount_paid).max(0);
        Self {
            invoice,
            stored_status,
            amount_paid,
            balance,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub view: InvoiceView,
    pub payments: Vec<Payment>,
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub async fn generate_invoice(
    State(context): State<core::ArcContext>,
    session: Session,
    Json(body): Json<GenerateInvoiceBody>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&session, "generate invoice")?;
    let today = today();
    let invoice =
        invoices::generate_invoice(&context, &session, body.contract_id, body.month, body.year, body.readings, today)
            .await?;
    tracing::info!(
        invoice_id = invoice.id,
        contract_id = invoice.contract_id,
        total_amount = invoice.total_amount,
        "Invoice generated"
    );
    Ok((StatusCode::CREATED, Json(InvoiceView::new(invoice, 0, today))))
}

pub async fn list_invoices(
    State(context): State<core::ArcContext>,
    session: Session,
    Query(query): Query<InvoiceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = tenant_scope(&context.db, &session).await?;
    let today = today();
    let page = PageRequest::new(query.page, query.limit);
    let filter = InvoiceFilter {
        status: query.status,
        contract_id: query.contract_id,
        tenant_id: scope,
        month: query.month,
        year: query.year,
        today,
    };
    let (invoices, total) = db::list_invoices(&context.db, &filter, page).await?;
    let views: Vec<InvoiceView> = invoices
        .into_iter()
        .map(|row| InvoiceView::new(row.invoice, row.amount_paid, today))
        .collect();
    Ok(Json(Page::new(views, total, page)))
}

pub async fn get_invoice(
    State(context): State<core::ArcContext>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = tenant_scope(&context.db, &session).await?;
    let invoice = db::get_invoice_by_id(&context.db, id).await?;
    if scope.is_some() {
        let contract = db::get_contract_by_id(&context.db, invoice.contract_id).await?;
        ensure_in_scope(scope, contract.tenant_id)?;
    }

    let payments = db::list_payments_for_invoice(&context.db, invoice.id).await?;
    let amount_paid = payments.iter().map(|payment| payment.amount).sum();
    Ok(Json(InvoiceDetail {
        view: InvoiceView::new(invoice, amount_paid, today()),
        payments,
    }))
}
