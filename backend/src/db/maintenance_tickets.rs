use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteExecutor};

use crate::core::{DbContext, DbError};
use crate::db::PageRequest;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum TicketCategory {
    Plumbing,
    Electrical,
    Structural,
    Appliance,
    Ventilation,
    DoorLock,
    Paint,
    Other,
}

impl FromStr for TicketCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plumbing" => Ok(Self::Plumbing),
            "electrical" => Ok(Self::Electrical),
            "structural" => Ok(Self::Structural),
            "appliance" => Ok(Self::Appliance),
            "ventilation" => Ok(Self::Ventilation),
            "door-lock" => Ok(Self::DoorLock),
            "paint" => Ok(Self::Paint),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown ticket category '{s}'")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl FromStr for TicketPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(format!("unknown ticket priority '{s}'")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum TicketStatus {
    New,
    Assigned,
    InProgress,
    Completed,
    Rejected,
}

impl TicketStatus {
    pub const ALL: [Self; 5] = [Self::New, Self::Assigned, Self::InProgress, Self::Completed, Self::Rejected];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Assigned => "assigned",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown ticket status '{s}'"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MaintenanceTicket {
    pub id: i64,
    pub unit_id: i64,
    pub tenant_id: i64,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub assigned_to: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug)]
pub struct NewMaintenanceTicket {
    pub unit_id: i64,
    pub tenant_id: i64,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct TicketStatusEvent {
    pub id: i64,
    pub ticket_id: i64,
    pub from_status: Option<TicketStatus>,
    pub to_status: TicketStatus,
    pub actor_id: i64,
    pub note: Option<String>,
    pub changed_at: NaiveDateTime,
}

#[derive(Debug)]
pub struct NewTicketStatusEvent {
    pub ticket_id: i64,
    pub from_status: Option<TicketStatus>,
    pub to_status: TicketStatus,
    pub actor_id: i64,
    pub note: Option<String>,
}

#[derive(Debug, Default)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category: Option<TicketCategory>,
    pub tenant_id: Option<i64>,
    pub unit_id: Option<i64>,
    pub search: Option<String>,
}

const TICKET_COLUMNS: &str = "id, unit_id, tenant_id, category, priority, title, description, status, \
    assigned_to, created_at, updated_at";

pub async fn create_ticket(db: impl SqliteExecutor<'_>, ticket: NewMaintenanceTicket) -> Result<MaintenanceTicket, DbError> {
    let sql = format!(
        r"
        INSERT INTO maintenance_tickets (unit_id, tenant_id, category, priority, title, description, status,
                                         created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 'new', CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        RETURNING {TICKET_COLUMNS}
        "
    );
    let ticket = sqlx::query_as::<_, MaintenanceTicket>(&sql)
        .bind(ticket.unit_id)
        .bind(ticket.tenant_id)
        .bind(ticket.category)
        .bind(ticket.priority)
        .bind(ticket.title)
        .bind(ticket.description)
        .fetch_one(db)
        .await?;
    Ok(ticket)
}

pub async fn get_ticket_by_id(db: impl SqliteExecutor<'_>, id: i64) -> Result<MaintenanceTicket, DbError> {
    let sql = format!("SELECT {TICKET_COLUMNS} FROM maintenance_tickets WHERE id = ?");
    let ticket = sqlx::query_as::<_, MaintenanceTicket>(&sql).bind(id).fetch_one(db).await?;
    Ok(ticket)
}

/// Compare-and-set on the status column: the update only lands if the ticket is still in `expected`.
pub async fn update_ticket_status(
    db: impl SqliteExecutor<'_>,
    id: i64,
    expected: TicketStatus,
    status: TicketStatus,
    assigned_to: Option<i64>,
) -> Result<MaintenanceTicket, DbError> {
    let sql = format!(
        r"
        UPDATE maintenance_tickets
        SET status = ?, assigned_to = COALESCE(?, assigned_to), updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND status = ?
        RETURNING {TICKET_COLUMNS}
        "
    );
    let ticket = sqlx::query_as::<_, MaintenanceTicket>(&sql)
        .bind(status)
        .bind(assigned_to)
        .bind(id)
        .bind(expected)
        .fetch_one(db)
        .await?;
    Ok(ticket)
}

pub async fn insert_status_event(db: impl SqliteExecutor<'_>, event: NewTicketStatusEvent) -> Result<TicketStatusEvent, DbError> {
    let event = sqlx::query_as::<_, TicketStatusEvent>(
        r"
        INSERT INTO ticket_status_events (ticket_id, from_status, to_status, actor_id, note, changed_at)
        VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        RETURNING id, ticket_id, from_status, to_status, actor_id, note, changed_at
        ",
    )
    .bind(event.ticket_id)
    .bind(event.from_status)
    .bind(event.to_status)
    .bind(event.actor_id)
    .bind(event.note)
    .fetch_one(db)
    .await?;
    Ok(event)
}

pub async fn list_status_events(db: impl SqliteExecutor<'_>, ticket_id: i64) -> Result<Vec<TicketStatusEvent>, DbError> {
    let events = sqlx::query_as::<_, TicketStatusEvent>(
        r"
        SELECT id, ticket_id, from_status, to_status, actor_id, note, changed_at
        FROM ticket_status_events
        WHERE ticket_id = ?
        ORDER BY id
        ",
    )
    .bind(ticket_id)
    .fetch_all(db)
    .await?;
    Ok(events)
}

fn push_ticket_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &TicketFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(priority) = filter.priority {
        builder.push(" AND priority = ").push_bind(priority);
    }
    if let Some(category) = filter.category {
        builder.push(" AND category = ").push_bind(category);
    }
    if let Some(tenant_id) = filter.tenant_id {
        builder.push(" AND tenant_id = ").push_bind(tenant_id);
    }
    if let Some(unit_id) = filter.unit_id {
        builder.push(" AND unit_id = ").push_bind(unit_id);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        builder
            .push(" AND (title LIKE ")
            .push_bind(pattern.clone())
            .push(" OR description LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list_tickets(
    db: &DbContext,
    filter: &TicketFilter,
    page: PageRequest,
) -> Result<(Vec<MaintenanceTicket>, i64), DbError> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM maintenance_tickets");
    push_ticket_filter(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

    let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {TICKET_COLUMNS} FROM maintenance_tickets"));
    push_ticket_filter(&mut select, filter);
    select
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let tickets = select.build_query_as::<MaintenanceTicket>().fetch_all(db).await?;
    Ok((tickets, total))
}
