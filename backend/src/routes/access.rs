use crate::auth::Session;
use crate::core::DbContext;
use crate::db;
use crate::db::Role;
use crate::routes::error::ApiError;
use crate::services::audit::{self, DomainAuditEvent};

/// Fails with 403 unless the caller is admin or staff.
pub fn require_manager(session: &Session, action: &str) -> Result<(), ApiError> {
    if session.is_manager() {
        return Ok(());
    }
    audit::log_domain_event(&DomainAuditEvent::AccessDenied {
        user_id: session.user_id,
        action: action.to_string(),
    });
    Err(ApiError::forbidden())
}

/// Tenant record a read must be restricted to; `None` for managers, who see everything.
pub async fn tenant_scope(db: &DbContext, session: &Session) -> Result<Option<i64>, ApiError> {
    match session.role {
        Role::Admin | Role::Staff => Ok(None),
        Role::Tenant => match db::get_tenant_by_user_id(db, session.user_id).await {
            Ok(tenant) => Ok(Some(tenant.id)),
            Err(e) if e.is_not_found() => Err(ApiError::Forbidden("No tenant profile is linked to this account".to_string())),
            Err(e) => Err(e.into()),
        },
    }
}

/// Fails with 403 when a tenant-scoped caller reaches for another tenant's record.
pub fn ensure_in_scope(scope: Option<i64>, tenant_id: i64) -> Result<(), ApiError> {
    match scope {
        Some(own) if own != tenant_id => Err(ApiError::forbidden()),
        _ => Ok(()),
    }
}
