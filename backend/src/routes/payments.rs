use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::auth::Session;
use crate::core;
use crate::db;
use crate::routes::access::{ensure_in_scope, require_manager, tenant_scope};
use crate::routes::error::ApiError;
use crate::routes::invoices::{InvoiceView, today};
use crate::services::payments::{self, PaymentRequest};

#[derive(Debug, Deserialize)]
pub struct PaymentQuery {
    pub invoice_id: i64,
}

pub async fn record_payment(
    State(context): State<core::ArcContext>,
    session: Session,
    Json(request): Json<PaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&session, "record payment")?;
    let receipt = payments::record_payment(&context, &session, request, Utc::now().naive_utc()).await?;
    let invoice = InvoiceView::new(receipt.invoice, receipt.amount_paid, today());
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "payment": receipt.payment,
            "invoice": invoice,
        })),
    ))
}

pub async fn list_payments(
    State(context): State<core::ArcContext>,
    session: Session,
    Query(query): Query<PaymentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = tenant_scope(&context.db, &session).await?;
    let invoice = db::get_invoice_by_id(&context.db, query.invoice_id).await?;
    if scope.is_some() {
        let contract = db::get_contract_by_id(&context.db, invoice.contract_id).await?;
        ensure_in_scope(scope, contract.tenant_id)?;
    }
    let payments = db::list_payments_for_invoice(&context.db, invoice.id).await?;
    Ok(Json(payments))
}
