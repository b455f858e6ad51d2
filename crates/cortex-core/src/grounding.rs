//! Grounding data model and the connector trigger table.
//!
//! A [`ConnectorResult`] is produced per connector invocation; the grounder
//! merges their payloads into one [`GroundedData`] and keeps the provenance
//! of every call in [`GroundingMetadata::sources`].
//!
//! Which connectors run for a question is decided by [`CONNECTOR_TABLE`]:
//! a connector fires when the intent matches its domain **or** an entity
//! specific to its domain was extracted. This over-fetches on ambiguous
//! questions in exchange for not missing relevant data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entities::ExtractedEntities;
use crate::intent::{DetectedIntent, QueryType};
use crate::models::{Booking, FinanceRecord, Property, Task, UtilityBill};

/// Parameters sent to a connector, keyed by name. Ordered for stable output.
pub type Params = BTreeMap<String, serde_json::Value>;

/// One data domain with a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectorKind {
    Properties,
    UtilityBills,
    Tasks,
    Bookings,
    Finances,
}

impl ConnectorKind {
    pub const ALL: [ConnectorKind; 5] = [
        ConnectorKind::Properties,
        ConnectorKind::UtilityBills,
        ConnectorKind::Tasks,
        ConnectorKind::Bookings,
        ConnectorKind::Finances,
    ];

    /// Stable provenance identifier (not a URL).
    pub fn route(self) -> &'static str {
        match self {
            ConnectorKind::Properties => "properties.fetch",
            ConnectorKind::UtilityBills => "utilityBills.fetch",
            ConnectorKind::Tasks => "tasks.fetch",
            ConnectorKind::Bookings => "bookings.fetch",
            ConnectorKind::Finances => "finances.fetch",
        }
    }

    pub fn from_route(route: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.route() == route)
    }
}

/// A row of the trigger table.
pub struct ConnectorRule {
    pub kind: ConnectorKind,
    pub intent: QueryType,
    /// Entity fields specific to this domain.
    pub entity_trigger: fn(&ExtractedEntities) -> bool,
}

fn names_property(e: &ExtractedEntities) -> bool {
    e.property_name.is_some()
}

fn names_utility_type(e: &ExtractedEntities) -> bool {
    e.utility_type.is_some()
}

fn names_finance_type(e: &ExtractedEntities) -> bool {
    e.finance_type.is_some()
}

fn never(_: &ExtractedEntities) -> bool {
    false
}

/// Static intent-or-entity → connector mapping, in invocation order.
pub const CONNECTOR_TABLE: &[ConnectorRule] = &[
    ConnectorRule {
        kind: ConnectorKind::Properties,
        intent: QueryType::PropertyQuery,
        entity_trigger: names_property,
    },
    ConnectorRule {
        kind: ConnectorKind::UtilityBills,
        intent: QueryType::UtilityQuery,
        entity_trigger: names_utility_type,
    },
    ConnectorRule {
        kind: ConnectorKind::Tasks,
        intent: QueryType::TaskQuery,
        entity_trigger: never,
    },
    ConnectorRule {
        kind: ConnectorKind::Bookings,
        intent: QueryType::BookingQuery,
        entity_trigger: never,
    },
    ConnectorRule {
        kind: ConnectorKind::Finances,
        intent: QueryType::FinanceQuery,
        entity_trigger: names_finance_type,
    },
];

/// Connectors to invoke for this intent and entity set, in table order.
pub fn plan_connectors(intent: &DetectedIntent, entities: &ExtractedEntities) -> Vec<ConnectorKind> {
    CONNECTOR_TABLE
        .iter()
        .filter(|rule| rule.intent == intent.query_type || (rule.entity_trigger)(entities))
        .map(|rule| rule.kind)
        .collect()
}

/// Outcome of one connector invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectorResult<T> {
    pub route: String,
    pub params: Params,
    pub success: bool,
    /// Milliseconds, measured whether or not the call succeeded.
    pub latency: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ConnectorResult<T> {
    /// Provenance without the payload.
    pub fn source_record(&self) -> SourceRecord {
        SourceRecord {
            route: self.route.clone(),
            params: self.params.clone(),
            success: self.success,
            latency: self.latency,
        }
    }

    /// The payload if the call succeeded.
    pub fn into_data(self) -> Option<T> {
        if self.success {
            self.data
        } else {
            None
        }
    }
}

/// Per-connector provenance kept in [`GroundingMetadata`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub route: String,
    pub params: Params,
    pub success: bool,
    pub latency: u64,
}

/// Citation form of a [`SourceRecord`]: success and latency are internal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub route: String,
    pub params: Params,
}

impl From<&SourceRecord> for SourceRef {
    fn from(record: &SourceRecord) -> Self {
        SourceRef {
            route: record.route.clone(),
            params: record.params.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    pub sources: Vec<SourceRecord>,
    pub total_latency: u64,
    pub cache_hit: bool,
}

/// Everything fetched for one question.
///
/// A domain field is `Some` only when its connector was invoked and
/// succeeded. An empty vector and `None` both contribute nothing to the
/// normalized text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundedData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<Property>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utility_bills: Option<Vec<UtilityBill>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookings: Option<Vec<Booking>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finances: Option<Vec<FinanceRecord>>,
    pub metadata: GroundingMetadata,
}

impl GroundedData {
    /// True when no domain holds at least one record.
    pub fn is_empty(&self) -> bool {
        fn none_or_empty<T>(v: &Option<Vec<T>>) -> bool {
            v.as_ref().map_or(true, Vec::is_empty)
        }
        none_or_empty(&self.properties)
            && none_or_empty(&self.utility_bills)
            && none_or_empty(&self.tasks)
            && none_or_empty(&self.bookings)
            && none_or_empty(&self.finances)
    }

    pub fn source_refs(&self) -> Vec<SourceRef> {
        self.metadata.sources.iter().map(SourceRef::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FinanceKind;

    fn intent(query_type: QueryType) -> DetectedIntent {
        DetectedIntent {
            query_type,
            confidence: 0.8,
        }
    }

    #[test]
    fn test_intent_alone_selects_its_connector() {
        let plan = plan_connectors(&intent(QueryType::TaskQuery), &ExtractedEntities::default());
        assert_eq!(plan, vec![ConnectorKind::Tasks]);
    }

    #[test]
    fn test_entities_add_connectors() {
        let entities = ExtractedEntities {
            property_name: Some("Villa Aruna".into()),
            utility_type: Some("water".into()),
            finance_type: Some(FinanceKind::Expense),
            ..Default::default()
        };
        let plan = plan_connectors(&intent(QueryType::BookingQuery), &entities);
        assert_eq!(
            plan,
            vec![
                ConnectorKind::Properties,
                ConnectorKind::UtilityBills,
                ConnectorKind::Bookings,
                ConnectorKind::Finances,
            ]
        );
    }

    #[test]
    fn test_unknown_without_entities_selects_nothing() {
        let plan = plan_connectors(&intent(QueryType::Unknown), &ExtractedEntities::default());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_no_duplicates_when_intent_and_entity_agree() {
        let entities = ExtractedEntities {
            utility_type: Some("gas".into()),
            ..Default::default()
        };
        let plan = plan_connectors(&intent(QueryType::UtilityQuery), &entities);
        assert_eq!(plan, vec![ConnectorKind::UtilityBills]);
    }

    #[test]
    fn test_routes_round_trip() {
        for kind in ConnectorKind::ALL {
            assert_eq!(ConnectorKind::from_route(kind.route()), Some(kind));
        }
        assert_eq!(ConnectorKind::from_route("/api/properties"), None);
    }

    #[test]
    fn test_failed_result_has_no_data() {
        let result: ConnectorResult<Vec<Property>> = ConnectorResult {
            route: "properties.fetch".into(),
            params: Params::new(),
            success: false,
            latency: 3,
            data: Some(Vec::new()),
        };
        assert!(!result.source_record().success);
        assert!(result.into_data().is_none());
    }

    #[test]
    fn test_empty_vectors_count_as_empty() {
        let data = GroundedData {
            tasks: Some(Vec::new()),
            ..Default::default()
        };
        assert!(data.is_empty());
    }
}
