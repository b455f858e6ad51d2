//! The grounder: decides which connectors to call, runs them, and merges
//! their results into one [`GroundedData`].
//!
//! Connector selection comes from the static trigger table in
//! [`cortex_core::grounding`]. When the property connector runs with a
//! property name, it runs first: a single unambiguous match yields a
//! `property_id` that every later connector uses to scope its query. The
//! remaining connectors are independent and run concurrently.
//!
//! The resolved id is returned in a new [`ExtractedEntities`] value inside
//! [`GroundingOutcome`]; the caller's entities are never mutated.

use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Instant;

use cortex_core::entities::ExtractedEntities;
use cortex_core::grounding::{
    plan_connectors, ConnectorKind, ConnectorResult, GroundedData, GroundingMetadata,
    SourceRecord,
};
use cortex_core::intent::DetectedIntent;
use cortex_core::models::Property;
use cortex_core::store::{
    BookingFilter, FinanceFilter, PropertyFilter, Store, TaskFilter, UtilityBillFilter,
};

use crate::connectors;

/// Grounded data plus the entities as refined during grounding.
#[derive(Debug, Clone)]
pub struct GroundingOutcome {
    pub entities: ExtractedEntities,
    pub data: GroundedData,
}

/// Statuses each domain understands. A status extracted for one domain
/// (e.g. "paid") is not applied to another.
const UTILITY_STATUSES: &[&str] = &["pending", "paid", "overdue"];
const TASK_STATUSES: &[&str] = &["pending", "in_progress", "completed", "cancelled"];
const BOOKING_STATUSES: &[&str] = &["pending", "confirmed", "completed", "cancelled"];

fn status_for(allowed: &[&str], status: Option<&String>) -> Option<String> {
    status.filter(|s| allowed.contains(&s.as_str())).cloned()
}

/// Pick the property a name refers to: the only case-insensitive exact
/// match, or the only partial match. Anything else is ambiguous.
pub fn resolve_property(candidates: &[Property], name: &str) -> Option<i64> {
    let exact: Vec<&Property> = candidates
        .iter()
        .filter(|p| p.name.trim().eq_ignore_ascii_case(name.trim()))
        .collect();
    match (exact.as_slice(), candidates) {
        ([only], _) => Some(only.id),
        ([], [only]) => Some(only.id),
        _ => None,
    }
}

fn absorb<T>(
    sources: &mut Vec<SourceRecord>,
    result: Option<ConnectorResult<Vec<T>>>,
) -> Option<Vec<T>> {
    let result = result?;
    sources.push(result.source_record());
    result.into_data()
}

pub struct Grounder {
    store: Arc<dyn Store>,
    max_records: i64,
}

impl Grounder {
    pub fn new(store: Arc<dyn Store>, max_records: i64) -> Self {
        Self { store, max_records }
    }

    /// Fetch the tenant data relevant to a question.
    ///
    /// Connector failures are recorded in `metadata.sources` with
    /// `success: false` and contribute no data. An `Err` means a defect in
    /// the grounder itself.
    pub async fn ground(
        &self,
        intent: &DetectedIntent,
        entities: &ExtractedEntities,
        organization_id: &str,
    ) -> Result<GroundingOutcome> {
        let started = Instant::now();

        if self.max_records < 1 {
            bail!("grounder misconfigured: max_records must be >= 1");
        }

        let plan = plan_connectors(intent, entities);
        tracing::debug!(?plan, intent = %intent.query_type, "connector plan");
        let wants = |kind: ConnectorKind| plan.contains(&kind);

        let mut entities = entities.clone();

        // Resolve the property name before fanning out.
        let mut resolved_properties = None;
        if wants(ConnectorKind::Properties) {
            if let Some(name) = entities.property_name.clone() {
                let result =
                    connectors::fetch_properties(self.store.as_ref(), &self.property_filter(&entities, organization_id))
                        .await;
                if let Some(rows) = result.data.as_deref() {
                    match resolve_property(rows, &name) {
                        Some(id) => {
                            tracing::debug!(property = %name, id, "property resolved");
                            entities = entities.with_property_id(id);
                        }
                        None => {
                            tracing::debug!(property = %name, matches = rows.len(), "property unresolved");
                        }
                    }
                }
                resolved_properties = Some(result);
            }
        }
        let properties_pending = wants(ConnectorKind::Properties) && resolved_properties.is_none();

        let store = self.store.as_ref();
        let entities_ref = &entities;
        let (properties, utility_bills, tasks, bookings, finances) = tokio::join!(
            async {
                if properties_pending {
                    let filter = self.property_filter(entities_ref, organization_id);
                    Some(connectors::fetch_properties(store, &filter).await)
                } else {
                    None
                }
            },
            async {
                if wants(ConnectorKind::UtilityBills) {
                    let filter = self.utility_bill_filter(entities_ref, organization_id);
                    Some(connectors::fetch_utility_bills(store, &filter).await)
                } else {
                    None
                }
            },
            async {
                if wants(ConnectorKind::Tasks) {
                    let filter = self.task_filter(entities_ref, organization_id);
                    Some(connectors::fetch_tasks(store, &filter).await)
                } else {
                    None
                }
            },
            async {
                if wants(ConnectorKind::Bookings) {
                    let filter = self.booking_filter(entities_ref, organization_id);
                    Some(connectors::fetch_bookings(store, &filter).await)
                } else {
                    None
                }
            },
            async {
                if wants(ConnectorKind::Finances) {
                    let filter = self.finance_filter(entities_ref, organization_id);
                    Some(connectors::fetch_finances(store, &filter).await)
                } else {
                    None
                }
            },
        );

        // Merge in table order; at most one of the two property results is set.
        let mut sources = Vec::with_capacity(plan.len());
        let data = GroundedData {
            properties: absorb(&mut sources, resolved_properties.or(properties)),
            utility_bills: absorb(&mut sources, utility_bills),
            tasks: absorb(&mut sources, tasks),
            bookings: absorb(&mut sources, bookings),
            finances: absorb(&mut sources, finances),
            metadata: GroundingMetadata::default(),
        };

        let failed = sources.iter().filter(|s| !s.success).count();
        let total_latency = started.elapsed().as_millis() as u64;
        tracing::info!(
            connectors = sources.len(),
            failed,
            latency_ms = total_latency,
            "grounding complete"
        );

        Ok(GroundingOutcome {
            entities,
            data: GroundedData {
                metadata: GroundingMetadata {
                    sources,
                    total_latency,
                    cache_hit: false,
                },
                ..data
            },
        })
    }

    fn property_filter(&self, e: &ExtractedEntities, org: &str) -> PropertyFilter {
        PropertyFilter {
            organization_id: org.to_string(),
            property_id: e.property_id,
            name: if e.property_id.is_some() {
                None
            } else {
                e.property_name.clone()
            },
            limit: self.max_records,
        }
    }

    /// Name fallback only applies while the id is unresolved.
    fn name_fallback(e: &ExtractedEntities) -> Option<String> {
        if e.property_id.is_some() {
            None
        } else {
            e.property_name.clone()
        }
    }

    fn utility_bill_filter(&self, e: &ExtractedEntities, org: &str) -> UtilityBillFilter {
        UtilityBillFilter {
            organization_id: org.to_string(),
            property_id: e.property_id,
            property_name: Self::name_fallback(e),
            utility_type: e.utility_type.clone(),
            payment_status: status_for(UTILITY_STATUSES, e.status.as_ref()),
            month: e.month,
            year: e.year,
            limit: self.max_records,
        }
    }

    fn task_filter(&self, e: &ExtractedEntities, org: &str) -> TaskFilter {
        let (date_from, date_to) = e.date_range();
        TaskFilter {
            organization_id: org.to_string(),
            property_id: e.property_id,
            property_name: Self::name_fallback(e),
            status: status_for(TASK_STATUSES, e.status.as_ref()),
            date_from,
            date_to,
            limit: self.max_records,
        }
    }

    fn booking_filter(&self, e: &ExtractedEntities, org: &str) -> BookingFilter {
        let (date_from, date_to) = e.date_range();
        BookingFilter {
            organization_id: org.to_string(),
            property_id: e.property_id,
            property_name: Self::name_fallback(e),
            status: status_for(BOOKING_STATUSES, e.status.as_ref()),
            date_from,
            date_to,
            limit: self.max_records,
        }
    }

    fn finance_filter(&self, e: &ExtractedEntities, org: &str) -> FinanceFilter {
        let (date_from, date_to) = e.date_range();
        FinanceFilter {
            organization_id: org.to_string(),
            property_id: e.property_id,
            property_name: Self::name_fallback(e),
            finance_type: e.finance_type,
            date_from,
            date_to,
            limit: self.max_records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property(id: i64, name: &str) -> Property {
        Property {
            id,
            organization_id: "org-a".into(),
            name: name.into(),
            location: None,
            bedrooms: None,
            status: None,
        }
    }

    #[test]
    fn test_resolve_single_partial_match() {
        let rows = vec![property(3, "Villa Aruna Canggu")];
        assert_eq!(resolve_property(&rows, "Villa Aruna"), Some(3));
    }

    #[test]
    fn test_resolve_prefers_exact_match() {
        let rows = vec![property(1, "Villa Aruna"), property(2, "Villa Aruna II")];
        assert_eq!(resolve_property(&rows, "villa aruna"), Some(1));
    }

    #[test]
    fn test_resolve_ambiguous_or_missing() {
        let rows = vec![property(1, "Villa Aruna East"), property(2, "Villa Aruna West")];
        assert_eq!(resolve_property(&rows, "Villa Aruna"), None);
        assert_eq!(resolve_property(&[], "Villa Aruna"), None);
    }

    #[test]
    fn test_status_only_applies_to_matching_domain() {
        let paid = Some("paid".to_string());
        assert_eq!(status_for(UTILITY_STATUSES, paid.as_ref()), paid);
        assert_eq!(status_for(TASK_STATUSES, paid.as_ref()), None);
        assert_eq!(status_for(TASK_STATUSES, None), None);
    }
}
