use serde::{Deserialize, Serialize};

use crate::db::UtilityType;

/// Billing constants used by the invoice generator.
///
/// Rates are in the smallest currency unit per metered unit (kWh, m³, month of internet).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BillingSettings {
    /// Days between the issue date and the due date of a generated invoice.
    #[serde(default)]
    pub due_days: u32,

    #[serde(default)]
    pub electricity_rate: i64,

    #[serde(default)]
    pub water_rate: i64,

    #[serde(default)]
    pub internet_rate: i64,
}

impl BillingSettings {
    #[must_use]
    pub const fn rate_for(&self, utility_type: UtilityType) -> i64 {
        match utility_type {
            UtilityType::Electricity => self.electricity_rate,
            UtilityType::Water => self.water_rate,
            UtilityType::Internet => self.internet_rate,
        }
    }
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            due_days: 10,
            electricity_rate: 3_500,
            water_rate: 25_000,
            internet_rate: 100_000,
        }
    }
}
