use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::auth::Session;
use crate::core;
use crate::db;
use crate::db::{
    Contract, ContractFilter, ContractStatus, NewContract, NotificationType, Page, PageRequest, TenantStatus, UnitStatus,
};
use crate::routes::access::{ensure_in_scope, require_manager, tenant_scope};
use crate::routes::error::ApiError;
use crate::routes::invoices::today;
use crate::services::audit::{self, DomainAuditEvent};
use crate::services::notify;

#[derive(Debug, Deserialize)]
pub struct ContractQuery {
    pub status: Option<ContractStatus>,
    pub unit_id: Option<i64>,
    pub tenant_id: Option<i64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ContractBody {
    pub unit_id: i64,
    pub tenant_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Defaults to the unit's listed rent
    pub rent_amount: Option<i64>,
    pub deposit_amount: Option<i64>,
}

pub async fn list_contracts(
    State(context): State<core::ArcContext>,
    session: Session,
    Query(query): Query<ContractQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = tenant_scope(&context.db, &session).await?;
    let page = PageRequest::new(query.page, query.limit);
    let filter = ContractFilter {
        status: query.status,
        unit_id: query.unit_id,
        tenant_id: scope.or(query.tenant_id),
    };
    let (contracts, total) = db::list_contracts(&context.db, &filter, page).await?;
    Ok(Json(Page::new(contracts, total, page)))
}

pub async fn get_contract(
    State(context): State<core::ArcContext>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = tenant_scope(&context.db, &session).await?;
    let contract = db::get_contract_by_id(&context.db, id).await?;
    ensure_in_scope(scope, contract.tenant_id)?;
    Ok(Json(contract))
}

pub async fn create_contract(
    State(context): State<core::ArcContext>,
    session: Session,
    Json(body): Json<ContractBody>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&session, "create contract")?;
    if body.end_date <= body.start_date {
        return Err(ApiError::Validation("end_date must be after start_date".to_string()));
    }

    let unit = db::get_unit_by_id(&context.db, body.unit_id).await?;
    db::get_tenant_by_id(&context.db, body.tenant_id).await?;
    let rent_amount = body.rent_amount.unwrap_or(unit.rent_price);
    let deposit_amount = body.deposit_amount.unwrap_or(unit.deposit_amount);
    if rent_amount <= 0 || deposit_amount < 0 {
        return Err(ApiError::Validation("rent_amount must be positive and deposit_amount not negative".to_string()));
    }

    let contract = db::create_contract(
        &context.db,
        NewContract {
            unit_id: unit.id,
            tenant_id: body.tenant_id,
            start_date: body.start_date,
            end_date: body.end_date,
            rent_amount,
            deposit_amount,
        },
    )
    .await?;
    tracing::info!(contract_id = contract.id, unit_id = unit.id, tenant_id = body.tenant_id, "Contract drafted");
    Ok((StatusCode::CREATED, Json(contract)))
}

/// Puts a draft contract into force: the unit becomes occupied and the tenant moves in.
pub async fn activate_contract(
    State(context): State<core::ArcContext>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&session, "activate contract")?;
    let contract = db::get_contract_by_id(&context.db, id).await?;
    if contract.status != ContractStatus::Draft {
        return Err(ApiError::Validation(format!("contract {id} is not a draft")));
    }
    let unit = db::get_unit_by_id(&context.db, contract.unit_id).await?;
    if unit.status == UnitStatus::Maintenance {
        return Err(ApiError::Validation(format!("unit {} is under maintenance", unit.id)));
    }
    if db::find_active_contract_for_unit(&context.db, unit.id).await?.is_some() {
        return Err(ApiError::Validation(format!("unit {} already has an active contract", unit.id)));
    }
    if let Some(current) = db::find_active_contract_for_tenant(&context.db, contract.tenant_id).await? {
        return Err(ApiError::Validation(format!(
            "tenant {} already has active contract {}",
            contract.tenant_id, current.id
        )));
    }

    let mut tx = context.db.begin().await?;
    let contract = db::set_contract_status(&mut *tx, id, ContractStatus::Active).await?;
    db::set_unit_status(&mut *tx, contract.unit_id, UnitStatus::Occupied).await?;
    db::set_tenant_residence(
        &mut *tx,
        contract.tenant_id,
        Some(contract.unit_id),
        Some(contract.start_date),
        TenantStatus::Active,
    )
    .await?;
    tx.commit().await?;

    audit::log_domain_event(&DomainAuditEvent::ContractActivated {
        contract_id: contract.id,
        unit_id: contract.unit_id,
        actor_id: session.user_id,
    });
    notify::notify_tenant(
        &context.db,
        contract.tenant_id,
        NotificationType::ContractActivated,
        "Contract activated",
        format!("Your lease for unit {} starts on {}.", unit.unit_number, contract.start_date),
    )
    .await;

    Ok(Json(contract))
}

/// Ends a contract. Ending an active one frees the unit and moves the tenant out.
pub async fn terminate_contract(
    State(context): State<core::ArcContext>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&session, "terminate contract")?;
    let contract = db::get_contract_by_id(&context.db, id).await?;
    let was_active = match contract.status {
        ContractStatus::Active => true,
        ContractStatus::Draft => false,
        ContractStatus::Expired | ContractStatus::Terminated => {
            return Err(ApiError::Validation(format!("contract {id} has already ended")));
        }
    };

    let contract = close_contract(&context, contract, ContractStatus::Terminated, was_active).await?;
    audit::log_domain_event(&DomainAuditEvent::ContractTerminated {
        contract_id: contract.id,
        unit_id: contract.unit_id,
        actor_id: session.user_id,
    });
    Ok(Json(contract))
}

/// Closes an active contract whose end date has passed and frees its unit.
pub async fn expire_contract(
    State(context): State<core::ArcContext>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&session, "expire contract")?;
    let contract = db::get_contract_by_id(&context.db, id).await?;
    if contract.status != ContractStatus::Active {
        return Err(ApiError::Validation(format!("contract {id} is not active")));
    }
    if today() <= contract.end_date {
        return Err(ApiError::Validation(format!("contract {id} runs until {}", contract.end_date)));
    }

    let contract = close_contract(&context, contract, ContractStatus::Expired, true).await?;
    audit::log_domain_event(&DomainAuditEvent::ContractExpired {
        contract_id: contract.id,
        unit_id: contract.unit_id,
        actor_id: session.user_id,
    });
    Ok(Json(contract))
}

async fn close_contract(
    context: &core::Context,
    contract: Contract,
    outcome: ContractStatus,
    release_unit: bool,
) -> Result<Contract, ApiError> {
    let mut tx = context.db.begin().await?;
    let closed = db::set_contract_status(&mut *tx, contract.id, outcome).await?;
    if release_unit {
        db::set_unit_status(&mut *tx, closed.unit_id, UnitStatus::Available).await?;
        db::release_tenant_residence(&mut *tx, closed.tenant_id, closed.unit_id).await?;
    }
    tx.commit().await?;
    Ok(closed)
}
