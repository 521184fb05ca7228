use std::collections::BTreeMap;

use chrono::{Days, Months, NaiveDate};
use serde::Deserialize;
use thiserror::Error;

use crate::auth::Session;
use crate::cfg::BillingSettings;
use crate::core::{Context, DbError};
use crate::db;
use crate::db::{Contract, ContractStatus, Invoice, InvoiceStatus, NewInvoice, NotificationType, UtilityReading, UtilityType};
use crate::services::audit::{self, DomainAuditEvent};
use crate::services::notify;

pub const MIN_BILLING_YEAR: i64 = 2000;
pub const MAX_BILLING_YEAR: i64 = 9999;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("{0}")]
    Validation(String),

    #[error("An invoice already exists for contract {contract_id} for {month}/{year}")]
    Duplicate { contract_id: i64, month: i64, year: i64 },

    #[error("Invalid {} reading: {reason}", .utility_type.as_str())]
    InvalidReading { utility_type: UtilityType, reason: String },

    #[error(transparent)]
    Database(#[from] DbError),
}

/// One meter's reading for the billing period.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct MeterReading {
    pub utility_type: UtilityType,
    pub previous_reading: Option<i64>,
    pub current_reading: i64,
}

impl From<&UtilityReading> for MeterReading {
    fn from(reading: &UtilityReading) -> Self {
        Self {
            utility_type: reading.utility_type,
            previous_reading: reading.previous_reading,
            current_reading: reading.current_reading,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct UtilityCharge {
    usage: i64,
    cost: i64,
}

/// Checks the contract and billing period an invoice is requested for.
pub fn check_billing_period(contract: &Contract, month: i64, year: i64) -> Result<(), BillingError> {
    if contract.status != ContractStatus::Active {
        return Err(BillingError::Validation(format!("contract {} is not active", contract.id)));
    }
    if !(1..=12).contains(&month) {
        return Err(BillingError::Validation(format!("month must be between 1 and 12, got {month}")));
    }
    if !(MIN_BILLING_YEAR..=MAX_BILLING_YEAR).contains(&year) {
        return Err(BillingError::Validation(format!(
            "year must be between {MIN_BILLING_YEAR} and {MAX_BILLING_YEAR}, got {year}"
        )));
    }

    let (first_day, last_day) = period_bounds(month, year)
        .ok_or_else(|| BillingError::Validation(format!("{month}/{year} is not a valid billing period")))?;
    if last_day < contract.start_date || first_day > contract.end_date {
        return Err(BillingError::Validation(format!(
            "{month}/{year} is outside contract {} ({} to {})",
            contract.id, contract.start_date, contract.end_date
        )));
    }
    Ok(())
}

/// First and last day of a calendar month.
fn period_bounds(month: i64, year: i64) -> Option<(NaiveDate, NaiveDate)> {
    let first_day = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, u32::try_from(month).ok()?, 1)?;
    let last_day = first_day.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((first_day, last_day))
}

fn charge_for(reading: &MeterReading, rate: i64) -> Result<UtilityCharge, BillingError> {
    let invalid = |reason: &str| BillingError::InvalidReading {
        utility_type: reading.utility_type,
        reason: reason.to_string(),
    };

    let previous = reading.previous_reading.ok_or_else(|| invalid("previous reading is missing"))?;
    if previous < 0 {
        return Err(invalid("previous reading is negative"));
    }
    if reading.current_reading < 0 {
        return Err(invalid("current reading is negative"));
    }
    if reading.current_reading < previous {
        return Err(invalid("current reading is lower than the previous reading"));
    }

    let usage = reading.current_reading - previous;
    let cost = usage.checked_mul(rate).ok_or_else(|| invalid("cost overflows"))?;
    Ok(UtilityCharge { usage, cost })
}

/// Computes the invoice for one contract and period without touching the store.
///
/// The result is always `issued`; utilities without a reading are billed at zero.
pub fn compute_invoice(
    contract: &Contract,
    month: i64,
    year: i64,
    readings: &[MeterReading],
    billing: &BillingSettings,
    issue_date: NaiveDate,
) -> Result<NewInvoice, BillingError> {
    check_billing_period(contract, month, year)?;

    let mut charges = BTreeMap::new();
    for reading in readings {
        let charge = charge_for(reading, billing.rate_for(reading.utility_type))?;
        if charges.insert(reading.utility_type, charge).is_some() {
            return Err(BillingError::InvalidReading {
                utility_type: reading.utility_type,
                reason: "more than one reading given for the period".to_string(),
            });
        }
    }
    let charge = |utility_type: UtilityType| charges.get(&utility_type).copied().unwrap_or_default();
    let electricity = charge(UtilityType::Electricity);
    let water = charge(UtilityType::Water);
    let internet = charge(UtilityType::Internet);

    let total_amount = [electricity.cost, water.cost, internet.cost]
        .into_iter()
        .try_fold(contract.rent_amount, i64::checked_add)
        .ok_or_else(|| BillingError::Validation("invoice total overflows".to_string()))?;

    let due_date = issue_date
        .checked_add_days(Days::new(u64::from(billing.due_days)))
        .ok_or_else(|| BillingError::Validation("due date is out of range".to_string()))?;

    Ok(NewInvoice {
        contract_id: contract.id,
        month,
        year,
        rent_amount: contract.rent_amount,
        electricity_usage: electricity.usage,
        electricity_cost: electricity.cost,
        water_usage: water.usage,
        water_cost: water.cost,
        internet_usage: internet.usage,
        internet_cost: internet.cost,
        total_amount,
        status: InvoiceStatus::Issued,
        issue_date,
        due_date,
    })
}

/// Generates and stores the monthly invoice of a contract.
///
/// When `readings` is `None` the readings recorded for the contract's unit in that
/// period are used.
pub async fn generate_invoice(
    context: &Context,
    actor: &Session,
    contract_id: i64,
    month: i64,
    year: i64,
    readings: Option<Vec<MeterReading>>,
    issue_date: NaiveDate,
) -> Result<Invoice, BillingError> {
    let contract = db::get_contract_by_id(&context.db, contract_id).await?;
    check_billing_period(&contract, month, year)?;

    if db::invoice_exists(&context.db, contract.id, month, year).await? {
        return Err(BillingError::Duplicate { contract_id, month, year });
    }

    let readings = match readings {
        Some(readings) => readings,
        None => db::readings_for_period(&context.db, contract.unit_id, month, year)
            .await?
            .iter()
            .map(MeterReading::from)
            .collect(),
    };

    let new_invoice = compute_invoice(&contract, month, year, &readings, &context.settings.billing, issue_date)?;
    let invoice = db::create_invoice(&context.db, new_invoice).await.map_err(|e| {
        if e.is_unique_violation() {
            BillingError::Duplicate { contract_id, month, year }
        } else {
            BillingError::Database(e)
        }
    })?;

    audit::log_domain_event(&DomainAuditEvent::InvoiceIssued {
        invoice_id: invoice.id,
        contract_id,
        month,
        year,
        total_amount: invoice.total_amount,
        actor_id: actor.user_id,
    });

    notify::notify_tenant(
        &context.db,
        contract.tenant_id,
        NotificationType::InvoiceIssued,
        "New invoice",
        format!(
            "Your invoice for {month:02}/{year} is {} and is due on {}.",
            invoice.total_amount, invoice.due_date
        ),
    )
    .await;

    Ok(invoice)
}
