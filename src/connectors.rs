//! Tenant-scoped grounding connectors.
//!
//! One fetch function per domain. Each wraps a [`Store`] query, times it,
//! and converts any persistence error into a `success: false` result, so a
//! failing domain never aborts the rest of the request.
//!
//! | Function | Route |
//! |----------|-------|
//! | [`fetch_properties`] | `properties.fetch` |
//! | [`fetch_utility_bills`] | `utilityBills.fetch` |
//! | [`fetch_tasks`] | `tasks.fetch` |
//! | [`fetch_bookings`] | `bookings.fetch` |
//! | [`fetch_finances`] | `finances.fetch` |

use anyhow::Result;
use std::future::Future;
use std::time::Instant;

use cortex_core::grounding::{ConnectorKind, ConnectorResult, Params};
use cortex_core::models::{Booking, FinanceRecord, Property, Task, UtilityBill};
use cortex_core::store::{
    filter_params, BookingFilter, FinanceFilter, PropertyFilter, Store, TaskFilter,
    UtilityBillFilter,
};

async fn run_connector<T, Fut>(
    kind: ConnectorKind,
    organization_id: &str,
    params: Params,
    query: Fut,
) -> ConnectorResult<Vec<T>>
where
    Fut: Future<Output = Result<Vec<T>>>,
{
    let route = kind.route();
    let started = Instant::now();

    let outcome = if organization_id.trim().is_empty() {
        Err(anyhow::anyhow!("organizationId is required"))
    } else {
        query.await
    };
    let latency = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(rows) => {
            tracing::debug!(route, rows = rows.len(), latency_ms = latency, "connector ok");
            ConnectorResult {
                route: route.to_string(),
                params,
                success: true,
                latency,
                data: Some(rows),
            }
        }
        Err(e) => {
            tracing::warn!(route, latency_ms = latency, error = %e, "connector failed");
            ConnectorResult {
                route: route.to_string(),
                params,
                success: false,
                latency,
                data: None,
            }
        }
    }
}

pub async fn fetch_properties(
    store: &dyn Store,
    filter: &PropertyFilter,
) -> ConnectorResult<Vec<Property>> {
    run_connector(
        ConnectorKind::Properties,
        &filter.organization_id,
        filter_params(filter),
        store.fetch_properties(filter),
    )
    .await
}

pub async fn fetch_utility_bills(
    store: &dyn Store,
    filter: &UtilityBillFilter,
) -> ConnectorResult<Vec<UtilityBill>> {
    run_connector(
        ConnectorKind::UtilityBills,
        &filter.organization_id,
        filter_params(filter),
        store.fetch_utility_bills(filter),
    )
    .await
}

pub async fn fetch_tasks(store: &dyn Store, filter: &TaskFilter) -> ConnectorResult<Vec<Task>> {
    run_connector(
        ConnectorKind::Tasks,
        &filter.organization_id,
        filter_params(filter),
        store.fetch_tasks(filter),
    )
    .await
}

pub async fn fetch_bookings(
    store: &dyn Store,
    filter: &BookingFilter,
) -> ConnectorResult<Vec<Booking>> {
    run_connector(
        ConnectorKind::Bookings,
        &filter.organization_id,
        filter_params(filter),
        store.fetch_bookings(filter),
    )
    .await
}

pub async fn fetch_finances(
    store: &dyn Store,
    filter: &FinanceFilter,
) -> ConnectorResult<Vec<FinanceRecord>> {
    run_connector(
        ConnectorKind::Finances,
        &filter.organization_id,
        filter_params(filter),
        store.fetch_finances(filter),
    )
    .await
}
