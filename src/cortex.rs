//! The question-answering pipeline.
//!
//! [`Cortex::answer_question`] is the single entry point the CLI and the
//! HTTP server share:
//!
//! ```text
//! question ──► detect intent ─┐
//!          └─► extract entities ─► ground ─► normalize ─► answer
//! ```

use anyhow::{bail, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;

use cortex_core::entities::{extract, ExtractedEntities};
use cortex_core::grounding::GroundedData;
use cortex_core::intent::{detect, DetectedIntent};
use cortex_core::normalize::normalize;
use cortex_core::store::Store;

use crate::answer::{AnswerGenerator, AnswerResult};
use crate::config::Config;
use crate::grounder::Grounder;
use crate::llm::{self, LlmProvider};

/// Everything the pipeline computes before the LLM call. Returned by
/// `cortex explain`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub intent: DetectedIntent,
    pub entities: ExtractedEntities,
    pub grounded: GroundedData,
    pub normalized: String,
}

pub struct Cortex {
    grounder: Grounder,
    generator: AnswerGenerator,
}

impl Cortex {
    pub fn new(store: Arc<dyn Store>, llm: Arc<dyn LlmProvider>, config: &Config) -> Self {
        Self {
            grounder: Grounder::new(store, config.grounding.max_records),
            generator: AnswerGenerator::new(llm, &config.llm),
        }
    }

    /// Build with the LLM provider named in the configuration.
    pub fn from_config(store: Arc<dyn Store>, config: &Config) -> Self {
        Self::new(store, llm::create_provider(&config.llm), config)
    }

    pub fn with_generator(mut self, generator: AnswerGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Answer a question for one tenant.
    ///
    /// Connector and LLM failures are folded into the result. An `Err` is
    /// returned only for a blank tenant or question, or a grounder defect.
    pub async fn answer_question(
        &self,
        question: &str,
        organization_id: &str,
    ) -> Result<AnswerResult> {
        validate(question, organization_id)?;

        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("question", %request_id, org = %organization_id);

        async {
            let (intent, entities) = analyze(question);
            tracing::info!(
                intent = %intent.query_type,
                confidence = intent.confidence,
                "question analyzed"
            );

            let outcome = self
                .grounder
                .ground(&intent, &entities, organization_id)
                .await?;
            let result = self
                .generator
                .answer(question, &intent, &outcome.data)
                .await;

            tracing::info!(
                sources = result.sources.len(),
                latency_ms = result.latency,
                "answer ready"
            );
            Ok::<_, anyhow::Error>(result)
        }
        .instrument(span)
        .await
    }

    /// Run every stage except the LLM call.
    pub async fn explain(&self, question: &str, organization_id: &str) -> Result<Explanation> {
        validate(question, organization_id)?;

        let (intent, entities) = analyze(question);
        let outcome = self
            .grounder
            .ground(&intent, &entities, organization_id)
            .await?;
        let normalized = normalize(&outcome.data);

        Ok(Explanation {
            intent,
            entities: outcome.entities,
            grounded: outcome.data,
            normalized,
        })
    }
}

fn validate(question: &str, organization_id: &str) -> Result<()> {
    if organization_id.trim().is_empty() {
        bail!("organization id is required");
    }
    if question.trim().is_empty() {
        bail!("question must not be empty");
    }
    Ok(())
}

fn analyze(question: &str) -> (DetectedIntent, ExtractedEntities) {
    (detect(question), extract(question))
}
