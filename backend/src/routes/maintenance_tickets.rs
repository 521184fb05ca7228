use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::core;
use crate::db;
use crate::db::{
    MaintenanceTicket, Page, PageRequest, TicketCategory, TicketFilter, TicketPriority, TicketStatus, TicketStatusEvent,
};
use crate::routes::access::{ensure_in_scope, tenant_scope};
use crate::routes::error::ApiError;
use crate::services::maintenance::{self, StatusChange, TicketDraft};

#[derive(Debug, Deserialize)]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category: Option<TicketCategory>,
    pub unit_id: Option<i64>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: MaintenanceTicket,
    pub events: Vec<TicketStatusEvent>,
}

pub async fn create_ticket(
    State(context): State<core::ArcContext>,
    session: Session,
    Json(draft): Json<TicketDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = maintenance::create_ticket(&context, &session, draft).await?;
    tracing::info!(ticket_id = ticket.id, tenant_id = ticket.tenant_id, "Maintenance ticket created");
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn list_tickets(
    State(context): State<core::ArcContext>,
    session: Session,
    Query(query): Query<TicketQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = tenant_scope(&context.db, &session).await?;
    let page = PageRequest::new(query.page, query.limit);
    let filter = TicketFilter {
        status: query.status,
        priority: query.priority,
        category: query.category,
        tenant_id: scope,
        unit_id: query.unit_id,
        search: query.search,
    };
    let (tickets, total) = db::list_tickets(&context.db, &filter, page).await?;
    Ok(Json(Page::new(tickets, total, page)))
}

pub async fn get_ticket(
    State(context): State<core::ArcContext>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = tenant_scope(&context.db, &session).await?;
    let ticket = db::get_ticket_by_id(&context.db, id).await?;
    ensure_in_scope(scope, ticket.tenant_id)?;
    let events = db::list_status_events(&context.db, ticket.id).await?;
    Ok(Json(TicketDetail { ticket, events }))
}

pub async fn update_ticket_status(
    State(context): State<core::ArcContext>,
    session: Session,
    Path(id): Path<i64>,
    Json(change): Json<StatusChange>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = maintenance::update_status(&context, &session, id, change).await?;
    tracing::info!(ticket_id = ticket.id, status = ticket.status.as_str(), "Maintenance ticket updated");
    Ok(Json(ticket))
}
