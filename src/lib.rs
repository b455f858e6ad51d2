//! # Captain Cortex
//!
//! Grounded question answering over short-term-rental operations data.
//!
//! A natural-language question from a property manager is classified,
//! mined for entities, answered from the tenant's own records, and only
//! then phrased by an LLM. When nothing relevant is found the LLM is never
//! called.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌──────────┐   ┌────────────┐   ┌─────────┐
//! │ question │──▶│ intent +   │──▶│ grounder │──▶│ normalizer │──▶│ answer  │
//! │ + tenant │   │ entities   │   │ (fan-out)│   │            │   │ (LLM)   │
//! └──────────┘   └────────────┘   └────┬─────┘   └────────────┘   └─────────┘
//!                                      │
//!                                 ┌────▼─────┐
//!                                 │ SQLite   │
//!                                 └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cortex init
//! cortex import ./data/sample-dataset.json
//! cortex ask "Show me pending maintenance tasks" --org org-demo
//! cortex serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`import`] | JSON dataset import |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` trait |
//! | [`connectors`] | Timed, failure-isolated fetches per domain |
//! | [`grounder`] | Connector planning, property resolution and fan-out |
//! | [`llm`] | Chat-completion provider abstraction |
//! | [`answer`] | Final answer generation |
//! | [`cortex`] | The end-to-end pipeline |
//! | [`server`] | HTTP server |
//!
//! Intent detection, entity extraction, the data model and the normalizer
//! live in the runtime-free `cortex-core` crate.

pub mod answer;
pub mod config;
pub mod connectors;
pub mod cortex;
pub mod db;
pub mod grounder;
pub mod import;
pub mod llm;
pub mod migrate;
pub mod server;
pub mod sqlite_store;

pub use answer::AnswerResult;
pub use cortex::{Cortex, Explanation};
