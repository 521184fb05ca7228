use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;

use crate::auth;
use crate::auth::Session;
use crate::core;
use crate::db;
use crate::db::{NewUser, Page, PageRequest, Role, TenantFields, TenantFilter, TenantStatus};
use crate::routes::access::{require_manager, tenant_scope};
use crate::routes::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct TenantQuery {
    pub status: Option<TenantStatus>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TenantProfile {
    pub full_name: String,
    pub identity_card: String,
    pub phone: String,
    pub status: Option<TenantStatus>,
}

/// A new tenant together with the account they log in with.
#[derive(Debug, Deserialize)]
pub struct NewTenantBody {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    #[serde(flatten)]
    pub profile: TenantProfile,
}

impl TryFrom<TenantProfile> for TenantFields {
    type Error = ApiError;

    fn try_from(profile: TenantProfile) -> Result<Self, Self::Error> {
        let fields = Self {
            full_name: profile.full_name.trim().to_string(),
            identity_card: profile.identity_card.trim().to_string(),
            phone: profile.phone.trim().to_string(),
            status: profile.status.unwrap_or(TenantStatus::Active),
        };
        if fields.full_name.is_empty() || fields.identity_card.is_empty() || fields.phone.is_empty() {
            return Err(ApiError::Validation("full_name, identity_card and phone are required".to_string()));
        }
        Ok(fields)
    }
}

pub async fn list_tenants(
    State(context): State<core::ArcContext>,
    session: Session,
    Query(query): Query<TenantQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&session, "list tenants")?;
    let page = PageRequest::new(query.page, query.limit);
    let filter = TenantFilter {
        status: query.status,
        search: query.search,
    };
    let (tenants, total) = db::list_tenants(&context.db, &filter, page).await?;
    Ok(Json(Page::new(tenants, total, page)))
}

pub async fn get_tenant(
    State(context): State<core::ArcContext>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&session, "read tenant")?;
    let tenant = db::get_tenant_by_id(&context.db, id).await?;
    Ok(Json(tenant))
}

/// The tenant profile of the calling tenant account
pub async fn get_own_tenant(
    State(context): State<core::ArcContext>,
    session: Session,
) -> Result<impl IntoResponse, ApiError> {
    let Some(tenant_id) = tenant_scope(&context.db, &session).await? else {
        return Err(ApiError::NotFound("Only tenant accounts have a tenant profile".to_string()));
    };
    let tenant = db::get_tenant_by_id(&context.db, tenant_id).await?;
    Ok(Json(tenant))
}

pub async fn create_tenant(
    State(context): State<core::ArcContext>,
    session: Session,
    Json(body): Json<NewTenantBody>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&session, "create tenant")?;

    let username = body.username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::Validation("username is required".to_string()));
    }
    auth::check_password_policy(&body.password).map_err(ApiError::Validation)?;
    let fields = TenantFields::try_from(body.profile)?;
    let password_hash = auth::hash_password(&body.password)
        .map_err(|e| ApiError::Validation(format!("password could not be hashed: {e}")))?;

    let mut tx = context.db.begin().await?;
    let user = db::create_user(
        &mut *tx,
        NewUser {
            username,
            password_hash: Some(password_hash),
            email: body.email.filter(|email| !email.trim().is_empty()),
            role: Role::Tenant,
        },
    )
    .await?;
    let tenant = db::create_tenant(&mut *tx, user.id, fields).await?;
    tx.commit().await?;

    tracing::info!(tenant_id = tenant.id, user_id = user.id, "Tenant created");
    Ok((StatusCode::CREATED, Json(json!({ "tenant": tenant, "user": user }))))
}

pub async fn update_tenant(
    State(context): State<core::ArcContext>,
    session: Session,
    Path(id): Path<i64>,
    Json(profile): Json<TenantProfile>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&session, "update tenant")?;
    let fields = TenantFields::try_from(profile)?;
    let tenant = db::update_tenant(&context.db, id, fields).await?;
    tracing::info!(tenant_id = tenant.id, "Tenant updated");
    Ok(Json(tenant))
}
