//! Tenant-owned domain records the connectors return.
//!
//! These mirror the rows of the property-management database. Every record
//! carries its `organization_id`; the store layer is responsible for never
//! returning a record owned by another tenant.
//!
//! Field names serialize in camelCase so the same types read the JSON
//! datasets accepted by `cortex import`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A rental property (villa, apartment, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: i64,
    pub organization_id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bedrooms: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A monthly utility bill (electricity, water, internet, gas) for a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityBill {
    pub id: i64,
    pub organization_id: String,
    pub property_id: i64,
    /// Joined from the owning property; not stored on the bill itself.
    #[serde(default)]
    pub property_name: Option<String>,
    pub utility_type: String,
    pub amount: Money,
    pub bill_month: u32,
    pub bill_year: i32,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub payment_status: String,
    #[serde(default)]
    pub provider: Option<String>,
}

/// An operational task (cleaning, maintenance, check-in prep).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub organization_id: String,
    #[serde(default)]
    pub property_id: Option<i64>,
    #[serde(default)]
    pub property_name: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// A guest stay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub organization_id: String,
    pub property_id: i64,
    #[serde(default)]
    pub property_name: Option<String>,
    pub guest_name: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub status: String,
    #[serde(default)]
    pub total_amount: Option<Money>,
    #[serde(default)]
    pub channel: Option<String>,
}

impl Booking {
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days().max(0)
    }
}

/// Direction of a finance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinanceKind {
    Income,
    Expense,
}

impl FinanceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FinanceKind::Income => "income",
            FinanceKind::Expense => "expense",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Some(FinanceKind::Income),
            "expense" => Some(FinanceKind::Expense),
            _ => None,
        }
    }
}

/// A ledger entry: booking revenue, payouts, commissions, wages, supplies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceRecord {
    pub id: i64,
    pub organization_id: String,
    #[serde(default)]
    pub property_id: Option<i64>,
    #[serde(default)]
    pub property_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: FinanceKind,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub amount: Money,
    pub date: NaiveDate,
}

/// A bundle of records for bulk import or in-memory seeding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub utility_bills: Vec<UtilityBill>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
    #[serde(default)]
    pub finances: Vec<FinanceRecord>,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
            && self.utility_bills.is_empty()
            && self.tasks.is_empty()
            && self.bookings.is_empty()
            && self.finances.is_empty()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
            + self.utility_bills.len()
            + self.tasks.len()
            + self.bookings.len()
            + self.finances.len()
    }
}
