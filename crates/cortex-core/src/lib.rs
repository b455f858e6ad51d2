//! # Cortex Core
//!
//! Runtime-free logic for Captain Cortex: the domain records, intent
//! detection, entity extraction, the grounding data model and connector
//! trigger table, exact money arithmetic, the read-only store trait, and
//! the normalizer that renders grounded data for the LLM.
//!
//! This crate contains no tokio, sqlx, or network dependencies.

pub mod entities;
pub mod grounding;
pub mod intent;
pub mod models;
pub mod money;
pub mod normalize;
pub mod store;

pub use entities::{extract, ExtractedEntities};
pub use grounding::{
    plan_connectors, ConnectorKind, ConnectorResult, GroundedData, GroundingMetadata, Params,
    SourceRecord, SourceRef,
};
pub use intent::{detect, DetectedIntent, QueryType};
pub use money::Money;
pub use normalize::{normalize, NO_DATA_SENTINEL};
