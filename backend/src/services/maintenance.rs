use serde::Deserialize;
use thiserror::Error;

use crate::auth::Session;
use crate::core::{Context, DbError};
use crate::db;
use crate::db::{
    MaintenanceTicket, NewMaintenanceTicket, NewTicketStatusEvent, NotificationType, Role, TicketCategory,
    TicketPriority, TicketStatus,
};
use crate::services::audit::{self, DomainAuditEvent};
use crate::services::notify;

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("{0}")]
    Validation(String),

    #[error("Cannot move a ticket from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition { from: TicketStatus, to: TicketStatus },

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<sqlx::Error> for TicketError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database(error.into())
    }
}

/// Ticket as submitted by a caller. Category and priority stay strings until validated.
#[derive(Debug, Deserialize)]
pub struct TicketDraft {
    pub unit_id: Option<i64>,
    pub tenant_id: Option<i64>,
    pub category: String,
    pub priority: String,
    pub title: String,
    pub description: String,
}

/// Requested transition. The target status is parsed after deserializing so an
/// unknown value is reported like any other invalid field.
#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
    pub assigned_to: Option<i64>,
    pub note: Option<String>,
}

#[must_use]
pub const fn is_terminal(status: TicketStatus) -> bool {
    matches!(status, TicketStatus::Completed | TicketStatus::Rejected)
}

/// The ticket lifecycle: `new -> assigned -> in-progress -> completed`, with
/// `rejected` reachable from every non-terminal state.
pub fn check_transition(from: TicketStatus, to: TicketStatus) -> Result<(), TicketError> {
    let allowed = match (from, to) {
        (TicketStatus::New, TicketStatus::Assigned)
        | (TicketStatus::Assigned, TicketStatus::InProgress)
        | (TicketStatus::InProgress, TicketStatus::Completed) => true,
        (from, TicketStatus::Rejected) => !is_terminal(from),
        _ => false,
    };
    if allowed { Ok(()) } else { Err(TicketError::InvalidTransition { from, to }) }
}

fn required_text(value: &str, field: &str) -> Result<String, TicketError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TicketError::Validation(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

/// The checked, caller-supplied part of a ticket, before it is tied to a unit and tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketFields {
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub title: String,
    pub description: String,
}

impl TicketFields {
    #[must_use]
    pub fn for_reporter(self, unit_id: i64, tenant_id: i64) -> NewMaintenanceTicket {
        NewMaintenanceTicket {
            unit_id,
            tenant_id,
            category: self.category,
            priority: self.priority,
            title: self.title,
            description: self.description,
        }
    }
}

pub fn validate_draft(draft: &TicketDraft) -> Result<TicketFields, TicketError> {
    Ok(TicketFields {
        category: draft.category.trim().parse().map_err(TicketError::Validation)?,
        priority: draft.priority.trim().parse().map_err(TicketError::Validation)?,
        title: required_text(&draft.title, "title")?,
        description: required_text(&draft.description, "description")?,
    })
}

pub fn parse_target_status(status: &str) -> Result<TicketStatus, TicketError> {
    status.trim().parse().map_err(TicketError::Validation)
}

/// Works out which tenant and unit a new ticket belongs to.
///
/// Tenants always file against their own record and, by default, the unit they live in.
async fn resolve_reporter(context: &Context, actor: &Session, draft: &TicketDraft) -> Result<(i64, i64), TicketError> {
    let tenant = match actor.role {
        Role::Tenant => {
            let tenant = db::get_tenant_by_user_id(&context.db, actor.user_id).await?;
            if draft.tenant_id.is_some_and(|id| id != tenant.id) {
                return Err(TicketError::Forbidden("tenants can only file tickets for themselves".to_string()));
            }
            tenant
        }
        Role::Admin | Role::Staff => {
            let tenant_id = draft
                .tenant_id
                .ok_or_else(|| TicketError::Validation("tenant_id is required".to_string()))?;
            db::get_tenant_by_id(&context.db, tenant_id).await?
        }
    };

    let unit_id = draft
        .unit_id
        .or(tenant.current_unit_id)
        .ok_or_else(|| TicketError::Validation("unit_id is required".to_string()))?;
    if actor.role == Role::Tenant && tenant.current_unit_id != Some(unit_id) {
        return Err(TicketError::Forbidden("tenants can only file tickets for the unit they rent".to_string()));
    }
    db::get_unit_by_id(&context.db, unit_id).await?;
    Ok((tenant.id, unit_id))
}

/// Opens a ticket in `new` and records its first status event.
pub async fn create_ticket(context: &Context, actor: &Session, draft: TicketDraft) -> Result<MaintenanceTicket, TicketError> {
    let fields = validate_draft(&draft)?;
    let (tenant_id, unit_id) = resolve_reporter(context, actor, &draft).await?;
    let new_ticket = fields.for_reporter(unit_id, tenant_id);

    let mut tx = context.db.begin().await?;
    let ticket = db::create_ticket(&mut *tx, new_ticket).await?;
    db::insert_status_event(
        &mut *tx,
        NewTicketStatusEvent {
            ticket_id: ticket.id,
            from_status: None,
            to_status: TicketStatus::New,
            actor_id: actor.user_id,
            note: None,
        },
    )
    .await?;
    tx.commit().await?;

    audit::log_domain_event(&DomainAuditEvent::TicketCreated {
        ticket_id: ticket.id,
        tenant_id,
        actor_id: actor.user_id,
    });
    notify::notify_managers(
        &context.db,
        NotificationType::TicketCreated,
        "New maintenance ticket",
        format!("Ticket #{}: {}", ticket.id, ticket.title),
    )
    .await;

    Ok(ticket)
}

/// Moves a ticket along its lifecycle on behalf of a staff or admin user.
pub async fn update_status(
    context: &Context,
    actor: &Session,
    ticket_id: i64,
    change: StatusChange,
) -> Result<MaintenanceTicket, TicketError> {
    if !actor.is_manager() {
        audit::log_domain_event(&DomainAuditEvent::AccessDenied {
            user_id: actor.user_id,
            action: format!("update status of ticket {ticket_id}"),
        });
        return Err(TicketError::Forbidden("only staff can change ticket status".to_string()));
    }

    let target = parse_target_status(&change.status)?;
    let ticket = db::get_ticket_by_id(&context.db, ticket_id).await?;
    check_transition(ticket.status, target)?;

    if let Some(assignee_id) = change.assigned_to {
        if target != TicketStatus::Assigned {
            return Err(TicketError::Validation("assigned_to is only accepted with status 'assigned'".to_string()));
        }
        let assignee = db::get_user_by_id(&context.db, assignee_id).await.map_err(|e| {
            if e.is_not_found() {
                TicketError::Validation(format!("user {assignee_id} does not exist"))
            } else {
                TicketError::Database(e)
            }
        })?;
        if !assignee.role.is_manager() {
            return Err(TicketError::Validation(format!("user {assignee_id} is not staff")));
        }
    }

    let mut tx = context.db.begin().await?;
    let updated = db::update_ticket_status(&mut *tx, ticket.id, ticket.status, target, change.assigned_to)
        .await
        .map_err(|e| {
            // Someone else moved the ticket since it was read
            if e.is_not_found() {
                TicketError::InvalidTransition { from: ticket.status, to: target }
            } else {
                TicketError::Database(e)
            }
        })?;
    db::insert_status_event(
        &mut *tx,
        NewTicketStatusEvent {
            ticket_id: ticket.id,
            from_status: Some(ticket.status),
            to_status: target,
            actor_id: actor.user_id,
            note: change.note.filter(|note| !note.trim().is_empty()),
        },
    )
    .await?;
    tx.commit().await?;

    audit::log_domain_event(&DomainAuditEvent::TicketStatusChanged {
        ticket_id: ticket.id,
        from: ticket.status,
        to: updated.status,
        actor_id: actor.user_id,
    });
    notify::notify_tenant(
        &context.db,
        updated.tenant_id,
        NotificationType::TicketStatusChanged,
        "Maintenance ticket updated",
        format!("Ticket #{} \"{}\" is now {}.", updated.id, updated.title, updated.status.as_str()),
    )
    .await;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(category: &str, priority: &str, title: &str, description: &str) -> TicketDraft {
        TicketDraft {
            unit_id: Some(1),
            tenant_id: Some(1),
            category: category.to_string(),
            priority: priority.to_string(),
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_forward_path_is_allowed() {
        assert!(check_transition(TicketStatus::New, TicketStatus::Assigned).is_ok());
        assert!(check_transition(TicketStatus::Assigned, TicketStatus::InProgress).is_ok());
        assert!(check_transition(TicketStatus::InProgress, TicketStatus::Completed).is_ok());
    }

    #[test]
    fn test_any_open_ticket_can_be_rejected() {
        for from in [TicketStatus::New, TicketStatus::Assigned, TicketStatus::InProgress] {
            assert!(check_transition(from, TicketStatus::Rejected).is_ok(), "{from:?}");
        }
    }

    #[test]
    fn test_terminal_states_cannot_move() {
        for from in [TicketStatus::Completed, TicketStatus::Rejected] {
            for to in TicketStatus::ALL {
                let result = check_transition(from, to);
                assert!(matches!(result, Err(TicketError::InvalidTransition { .. })), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn test_skips_and_self_transitions_are_invalid() {
        let invalid = [
            (TicketStatus::New, TicketStatus::InProgress),
            (TicketStatus::New, TicketStatus::Completed),
            (TicketStatus::Assigned, TicketStatus::Completed),
            (TicketStatus::Assigned, TicketStatus::New),
            (TicketStatus::InProgress, TicketStatus::Assigned),
            (TicketStatus::New, TicketStatus::New),
            (TicketStatus::InProgress, TicketStatus::InProgress),
        ];
        for (from, to) in invalid {
            assert!(matches!(check_transition(from, to), Err(TicketError::InvalidTransition { .. })), "{from:?} -> {to:?}");
        }
    }

    #[test]
    fn test_valid_draft_is_trimmed() {
        let fields = validate_draft(&draft("plumbing", "high", "  Leaking tap ", "Kitchen sink drips")).unwrap();
        assert_eq!(fields.category, TicketCategory::Plumbing);
        assert_eq!(fields.priority, TicketPriority::High);
        assert_eq!(fields.title, "Leaking tap");

        let ticket = fields.for_reporter(3, 4);
        assert_eq!((ticket.unit_id, ticket.tenant_id), (3, 4));
        assert_eq!(ticket.description, "Kitchen sink drips");
    }

    #[test]
    fn test_blank_title_or_description_is_rejected() {
        assert!(matches!(validate_draft(&draft("plumbing", "high", "   ", "x")), Err(TicketError::Validation(_))));
        assert!(matches!(validate_draft(&draft("plumbing", "high", "x", "")), Err(TicketError::Validation(_))));
    }

    #[test]
    fn test_unknown_category_or_priority_is_rejected() {
        assert!(matches!(validate_draft(&draft("roof", "high", "x", "y")), Err(TicketError::Validation(_))));
        assert!(matches!(validate_draft(&draft("plumbing", "asap", "x", "y")), Err(TicketError::Validation(_))));
    }

    #[test]
    fn test_target_status_is_parsed_from_text() {
        assert_eq!(parse_target_status(" in-progress ").unwrap(), TicketStatus::InProgress);
        assert!(matches!(parse_target_status("done"), Err(TicketError::Validation(_))));
        assert!(matches!(parse_target_status("InProgress"), Err(TicketError::Validation(_))));
    }
}
