//! In-memory [`Store`] implementation for tests and demos.
//!
//! Holds a [`Dataset`] behind `std::sync::RwLock`. Filtering follows the
//! same rules as the SQLite store: tenant scoping first, case-insensitive
//! name containment, stay-overlap for bookings, newest records first.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{Booking, Dataset, FinanceRecord, Property, Task, UtilityBill};

use super::{BookingFilter, FinanceFilter, PropertyFilter, Store, TaskFilter, UtilityBillFilter};

/// In-memory store seeded from a [`Dataset`].
pub struct InMemoryStore {
    data: RwLock<Dataset>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::from_dataset(Dataset::default())
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            data: RwLock::new(dataset),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Dataset>> {
        self.data
            .read()
            .map_err(|_| anyhow::anyhow!("in-memory store lock poisoned"))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn eq_ci(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Name of a property, looked up within the same tenant only.
fn property_name_of(properties: &[Property], org: &str, id: i64) -> Option<String> {
    properties
        .iter()
        .find(|p| p.organization_id == org && p.id == id)
        .map(|p| p.name.clone())
}

/// Shared property scoping: an id wins; otherwise a name filter must match
/// the joined property name.
fn matches_property(
    record_property: Option<i64>,
    record_property_name: Option<&str>,
    want_id: Option<i64>,
    want_name: Option<&str>,
) -> bool {
    if let Some(id) = want_id {
        return record_property == Some(id);
    }
    match want_name {
        Some(name) => record_property_name.is_some_and(|n| contains_ci(n, name)),
        None => true,
    }
}

fn in_window(date: NaiveDate, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    from.map_or(true, |f| date >= f) && to.map_or(true, |t| date <= t)
}

fn cap<T>(mut records: Vec<T>, limit: i64) -> Vec<T> {
    records.truncate(limit.max(0) as usize);
    records
}

#[async_trait]
impl Store for InMemoryStore {
    async fn fetch_properties(&self, filter: &PropertyFilter) -> Result<Vec<Property>> {
        let data = self.read()?;
        let mut out: Vec<Property> = data
            .properties
            .iter()
            .filter(|p| p.organization_id == filter.organization_id)
            .filter(|p| filter.property_id.map_or(true, |id| p.id == id))
            .filter(|p| filter.name.as_deref().map_or(true, |n| contains_ci(&p.name, n)))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(cap(out, filter.limit))
    }

    async fn fetch_utility_bills(&self, filter: &UtilityBillFilter) -> Result<Vec<UtilityBill>> {
        let data = self.read()?;
        let org = filter.organization_id.as_str();
        let mut out: Vec<UtilityBill> = data
            .utility_bills
            .iter()
            .filter(|b| b.organization_id == org)
            .map(|b| UtilityBill {
                property_name: property_name_of(&data.properties, org, b.property_id),
                ..b.clone()
            })
            .filter(|b| {
                matches_property(
                    Some(b.property_id),
                    b.property_name.as_deref(),
                    filter.property_id,
                    filter.property_name.as_deref(),
                )
            })
            .filter(|b| filter.utility_type.as_deref().map_or(true, |t| eq_ci(&b.utility_type, t)))
            .filter(|b| {
                filter
                    .payment_status
                    .as_deref()
                    .map_or(true, |s| eq_ci(&b.payment_status, s))
            })
            .filter(|b| filter.month.map_or(true, |m| b.bill_month == m))
            .filter(|b| filter.year.map_or(true, |y| b.bill_year == y))
            .collect();
        out.sort_by(|a, b| {
            (b.bill_year, b.bill_month)
                .cmp(&(a.bill_year, a.bill_month))
                .then(a.id.cmp(&b.id))
        });
        Ok(cap(out, filter.limit))
    }

    async fn fetch_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let data = self.read()?;
        let org = filter.organization_id.as_str();
        let windowed = filter.date_from.is_some() || filter.date_to.is_some();
        let mut out: Vec<Task> = data
            .tasks
            .iter()
            .filter(|t| t.organization_id == org)
            .map(|t| Task {
                property_name: t
                    .property_id
                    .and_then(|id| property_name_of(&data.properties, org, id)),
                ..t.clone()
            })
            .filter(|t| {
                matches_property(
                    t.property_id,
                    t.property_name.as_deref(),
                    filter.property_id,
                    filter.property_name.as_deref(),
                )
            })
            .filter(|t| filter.status.as_deref().map_or(true, |s| eq_ci(&t.status, s)))
            .filter(|t| {
                !windowed
                    || t.due_date
                        .is_some_and(|d| in_window(d, filter.date_from, filter.date_to))
            })
            .collect();
        out.sort_by(|a, b| b.due_date.cmp(&a.due_date).then(a.id.cmp(&b.id)));
        Ok(cap(out, filter.limit))
    }

    async fn fetch_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>> {
        let data = self.read()?;
        let org = filter.organization_id.as_str();
        let mut out: Vec<Booking> = data
            .bookings
            .iter()
            .filter(|b| b.organization_id == org)
            .map(|b| Booking {
                property_name: property_name_of(&data.properties, org, b.property_id),
                ..b.clone()
            })
            .filter(|b| {
                matches_property(
                    Some(b.property_id),
                    b.property_name.as_deref(),
                    filter.property_id,
                    filter.property_name.as_deref(),
                )
            })
            .filter(|b| filter.status.as_deref().map_or(true, |s| eq_ci(&b.status, s)))
            .filter(|b| filter.date_to.map_or(true, |to| b.check_in <= to))
            .filter(|b| filter.date_from.map_or(true, |from| b.check_out >= from))
            .collect();
        out.sort_by(|a, b| b.check_in.cmp(&a.check_in).then(a.id.cmp(&b.id)));
        Ok(cap(out, filter.limit))
    }

    async fn fetch_finances(&self, filter: &FinanceFilter) -> Result<Vec<FinanceRecord>> {
        let data = self.read()?;
        let org = filter.organization_id.as_str();
        let mut out: Vec<FinanceRecord> = data
            .finances
            .iter()
            .filter(|f| f.organization_id == org)
            .map(|f| FinanceRecord {
                property_name: f
                    .property_id
                    .and_then(|id| property_name_of(&data.properties, org, id)),
                ..f.clone()
            })
            .filter(|f| {
                matches_property(
                    f.property_id,
                    f.property_name.as_deref(),
                    filter.property_id,
                    filter.property_name.as_deref(),
                )
            })
            .filter(|f| filter.finance_type.map_or(true, |k| f.kind == k))
            .filter(|f| in_window(f.date, filter.date_from, filter.date_to))
            .collect();
        out.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)));
        Ok(cap(out, filter.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FinanceKind;
    use crate::money::Money;

    fn property(id: i64, org: &str, name: &str) -> Property {
        Property {
            id,
            organization_id: org.into(),
            name: name.into(),
            location: None,
            bedrooms: None,
            status: None,
        }
    }

    fn task(id: i64, org: &str, property_id: i64, status: &str) -> Task {
        Task {
            id,
            organization_id: org.into(),
            property_id: Some(property_id),
            property_name: None,
            title: format!("task {}", id),
            description: None,
            status: status.into(),
            priority: None,
            assigned_to: None,
            due_date: NaiveDate::from_ymd_opt(2025, 1, id as u32),
        }
    }

    fn seeded() -> InMemoryStore {
        InMemoryStore::from_dataset(Dataset {
            properties: vec![
                property(1, "org-a", "Villa Aruna"),
                property(2, "org-a", "Villa Melati"),
                // Same id, other tenant.
                property(1, "org-b", "Villa Aruna"),
            ],
            tasks: vec![
                task(1, "org-a", 1, "pending"),
                task(2, "org-a", 2, "completed"),
                task(3, "org-b", 1, "pending"),
            ],
            finances: vec![FinanceRecord {
                id: 1,
                organization_id: "org-a".into(),
                property_id: Some(1),
                property_name: None,
                kind: FinanceKind::Income,
                category: None,
                description: None,
                amount: Money::parse("100").unwrap(),
                date: NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
            }],
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_properties_scoped_by_tenant() {
        let store = seeded();
        let filter = PropertyFilter {
            organization_id: "org-a".into(),
            name: Some("aruna".into()),
            limit: 10,
            ..Default::default()
        };
        let found = store.fetch_properties(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].organization_id, "org-a");
    }

    #[tokio::test]
    async fn test_tasks_status_filter_and_join() {
        let store = seeded();
        let filter = TaskFilter {
            organization_id: "org-a".into(),
            status: Some("pending".into()),
            limit: 10,
            ..Default::default()
        };
        let tasks = store.fetch_tasks(&filter).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 1);
        assert_eq!(tasks[0].property_name.as_deref(), Some("Villa Aruna"));
    }

    #[tokio::test]
    async fn test_property_name_filter_without_id() {
        let store = seeded();
        let filter = TaskFilter {
            organization_id: "org-a".into(),
            property_name: Some("melati".into()),
            limit: 10,
            ..Default::default()
        };
        let tasks = store.fetch_tasks(&filter).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 2);

        let none = TaskFilter {
            property_name: Some("Nonexistent".into()),
            ..filter
        };
        assert!(store.fetch_tasks(&none).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_finances_window_and_limit() {
        let store = seeded();
        let mut filter = FinanceFilter {
            organization_id: "org-a".into(),
            date_from: NaiveDate::from_ymd_opt(2025, 1, 1),
            date_to: NaiveDate::from_ymd_opt(2025, 1, 31),
            limit: 10,
            ..Default::default()
        };
        assert_eq!(store.fetch_finances(&filter).await.unwrap().len(), 1);

        filter.limit = 0;
        assert!(store.fetch_finances(&filter).await.unwrap().is_empty());

        filter.limit = 10;
        filter.date_from = NaiveDate::from_ymd_opt(2025, 2, 1);
        filter.date_to = None;
        assert!(store.fetch_finances(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tenant_sees_nothing() {
        let store = seeded();
        let filter = TaskFilter {
            organization_id: "org-c".into(),
            limit: 10,
            ..Default::default()
        };
        assert!(store.fetch_tasks(&filter).await.unwrap().is_empty());
    }
}
