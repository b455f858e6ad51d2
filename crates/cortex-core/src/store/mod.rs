//! Persistence abstraction for the grounding connectors.
//!
//! The [`Store`] trait is the read-only interface the connectors call.
//! Every filter carries a required `organization_id`; implementations must
//! apply it to every query, including joins used to resolve property names.
//!
//! Implementations must be `Send + Sync` so connectors can run
//! concurrently on one store.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use crate::grounding::Params;
use crate::models::{Booking, FinanceKind, FinanceRecord, Property, Task, UtilityBill};

/// Property lookup. `name` matches case-insensitively by containment.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFilter {
    pub organization_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub limit: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityBillFilter {
    pub organization_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<i64>,
    /// Used only when `property_id` is unresolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utility_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub limit: i64,
}

/// Tasks; the date window applies to `due_date`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub organization_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    pub limit: i64,
}

/// Bookings; a booking matches the window when its stay overlaps it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingFilter {
    pub organization_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    pub limit: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceFilter {
    pub organization_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub finance_type: Option<FinanceKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    pub limit: i64,
}

/// Provenance parameters for a filter: its non-empty fields by name.
pub fn filter_params<F: Serialize>(filter: &F) -> Params {
    match serde_json::to_value(filter) {
        Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
        _ => Params::new(),
    }
}

/// Read-only, tenant-scoped access to the operational records.
///
/// | Method | Domain |
/// |--------|--------|
/// | [`fetch_properties`](Store::fetch_properties) | properties |
/// | [`fetch_utility_bills`](Store::fetch_utility_bills) | utility bills |
/// | [`fetch_tasks`](Store::fetch_tasks) | tasks |
/// | [`fetch_bookings`](Store::fetch_bookings) | bookings |
/// | [`fetch_finances`](Store::fetch_finances) | finance ledger |
#[async_trait]
pub trait Store: Send + Sync {
    async fn fetch_properties(&self, filter: &PropertyFilter) -> Result<Vec<Property>>;

    async fn fetch_utility_bills(&self, filter: &UtilityBillFilter) -> Result<Vec<UtilityBill>>;

    async fn fetch_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>>;

    async fn fetch_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>>;

    async fn fetch_finances(&self, filter: &FinanceFilter) -> Result<Vec<FinanceRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_params_skip_unset_fields() {
        let filter = TaskFilter {
            organization_id: "org-a".into(),
            status: Some("pending".into()),
            limit: 50,
            ..Default::default()
        };
        let params = filter_params(&filter);
        let keys: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["limit", "organizationId", "status"]);
        assert_eq!(params["status"], "pending");
    }

    #[test]
    fn test_finance_type_param_name() {
        let filter = FinanceFilter {
            organization_id: "org-a".into(),
            finance_type: Some(FinanceKind::Income),
            date_from: NaiveDate::from_ymd_opt(2025, 1, 1),
            limit: 10,
            ..Default::default()
        };
        let params = filter_params(&filter);
        assert_eq!(params["type"], "income");
        assert_eq!(params["dateFrom"], "2025-01-01");
    }
}
