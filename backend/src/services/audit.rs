use serde::Serialize;
use std::fmt;

use crate::db::{InvoiceStatus, TicketStatus};

/// Bookkeeping events worth keeping an audit trail of.
#[derive(Debug, Clone, Serialize)]
pub enum DomainAuditEvent {
    InvoiceIssued {
        invoice_id: i64,
        contract_id: i64,
        month: i64,
        year: i64,
        total_amount: i64,
        actor_id: i64,
    },
    PaymentRecorded {
        payment_id: i64,
        invoice_id: i64,
        amount: i64,
        amount_paid: i64,
        invoice_status: InvoiceStatus,
        actor_id: i64,
    },
    TicketCreated {
        ticket_id: i64,
        tenant_id: i64,
        actor_id: i64,
    },
    TicketStatusChanged {
        ticket_id: i64,
        from: TicketStatus,
        to: TicketStatus,
        actor_id: i64,
    },
    ContractActivated {
        contract_id: i64,
        unit_id: i64,
        actor_id: i64,
    },
    ContractTerminated {
        contract_id: i64,
        unit_id: i64,
        actor_id: i64,
    },
    ContractExpired {
        contract_id: i64,
        unit_id: i64,
        actor_id: i64,
    },
    LoginFailed {
        username: String,
    },
    AccessDenied {
        user_id: i64,
        action: String,
    },
}

impl fmt::Display for DomainAuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvoiceIssued { invoice_id, contract_id, month, year, total_amount, .. } => {
                write!(f, "Invoice {invoice_id} issued for contract {contract_id} ({month}/{year}), total {total_amount}")
            }
            Self::PaymentRecorded { payment_id, invoice_id, amount, amount_paid, invoice_status, .. } => {
                write!(
                    f,
                    "Payment {payment_id} of {amount} recorded on invoice {invoice_id} (paid {amount_paid}, now {})",
                    invoice_status.as_str()
                )
            }
            Self::TicketCreated { ticket_id, tenant_id, .. } => {
                write!(f, "Maintenance ticket {ticket_id} opened for tenant {tenant_id}")
            }
            Self::TicketStatusChanged { ticket_id, from, to, actor_id } => {
                write!(f, "Ticket {ticket_id} moved {} -> {} by user {actor_id}", from.as_str(), to.as_str())
            }
            Self::ContractActivated { contract_id, unit_id, .. } => {
                write!(f, "Contract {contract_id} activated on unit {unit_id}")
            }
            Self::ContractTerminated { contract_id, unit_id, .. } => {
                write!(f, "Contract {contract_id} terminated, unit {unit_id} released")
            }
            Self::ContractExpired { contract_id, unit_id, .. } => {
                write!(f, "Contract {contract_id} expired, unit {unit_id} released")
            }
            Self::LoginFailed { username } => write!(f, "Failed login for {username}"),
            Self::AccessDenied { user_id, action } => write!(f, "User {user_id} denied: {action}"),
        }
    }
}

/// Log a domain audit event with structured data
pub fn log_domain_event(event: &DomainAuditEvent) {
    match event {
        DomainAuditEvent::LoginFailed { .. } | DomainAuditEvent::AccessDenied { .. } => {
            tracing::warn!(
                event_type = "domain_audit",
                event = ?event,
                message = %event,
                "Security event"
            );
        }
        _ => {
            tracing::info!(
                event_type = "domain_audit",
                event = ?event,
                message = %event,
                "Domain event"
            );
        }
    }
}
