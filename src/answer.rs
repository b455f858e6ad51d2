//! The answer generator: turns grounded data into the final [`AnswerResult`].
//!
//! Three outcomes, none of which is an `Err`:
//!
//! 1. Nothing was found: a fixed explanation, no LLM call.
//! 2. The LLM answered: its text, restating the grounded records.
//! 3. The LLM failed: an apology naming the failure class.
//!
//! `sources` is filled from the grounding metadata in every case.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cortex_core::grounding::{GroundedData, Params, SourceRef};
use cortex_core::intent::DetectedIntent;
use cortex_core::normalize::{normalize, NO_DATA_SENTINEL};

use crate::config::LlmConfig;
use crate::llm::{ChatRequest, LlmError, LlmProvider};

/// Final artifact of one question. Serialized as the HTTP response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    /// Milliseconds spent in the answer stage only.
    pub latency: u64,
    /// Always false; no answer cache exists.
    pub cached: bool,
    pub intent: String,
    pub confidence: f64,
}

pub const SYSTEM_PROMPT: &str = "\
You are Captain Cortex, an assistant for short-term-rental property managers.
Answer the user's question using ONLY the data provided below the question.
Rules:
- If the data does not fully answer the question, say what is missing.
- Cite concrete values from the data: names, amounts, dates, statuses.
- Do not speculate, estimate, or invent records, totals, or trends.
- Keep the answer short and factual.";

pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            llm,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn answer(
        &self,
        question: &str,
        intent: &DetectedIntent,
        grounded: &GroundedData,
    ) -> AnswerResult {
        let started = Instant::now();
        let text = normalize(grounded);

        let answer = if text == NO_DATA_SENTINEL {
            tracing::info!("no grounded data; skipping LLM");
            no_data_answer(&grounded.metadata.sources.iter().map(|s| &s.params).collect::<Vec<_>>())
        } else {
            match self.generate(question, &text).await {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::warn!(provider = self.llm.name(), error = %e, "LLM call failed");
                    apology(&e)
                }
            }
        };

        AnswerResult {
            answer,
            sources: grounded.source_refs(),
            latency: started.elapsed().as_millis() as u64,
            cached: false,
            intent: intent.query_type.as_str().to_string(),
            confidence: intent.confidence,
        }
    }

    async fn generate(&self, question: &str, data: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: format!("Question: {}\n\nData:\n{}", question.trim(), data),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        match tokio::time::timeout(self.timeout, self.llm.complete(&request)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.timeout)),
        }
    }
}

/// The fixed reply when grounding found nothing. Mentions the property
/// name and period that were searched for, when there were any.
pub fn no_data_answer(params: &[&Params]) -> String {
    let name = params
        .iter()
        .find_map(|p| p.get("name").or_else(|| p.get("propertyName")))
        .and_then(|v| v.as_str());
    let period = params.iter().find_map(|p| describe_period(p));

    let mut answer = String::from("I couldn't find any records matching your question");
    if let Some(name) = name {
        answer.push_str(&format!(" for \"{}\"", name));
    }
    if let Some(period) = &period {
        answer.push_str(&format!(" in {}", period));
    }
    answer.push_str(".\n\nThis usually means one of the following:\n");
    answer.push_str(
        "- The property name is misspelled or differs from the name stored in the system.\n",
    );
    answer.push_str("- The relevant data has not been uploaded yet.\n");
    answer.push_str("- There are no records for the time period you asked about.\n");
    answer.push_str(
        "\nTry rephrasing your question with the exact property name or a different period.",
    );
    answer
}

fn describe_period(params: &Params) -> Option<String> {
    let month = params.get("month").and_then(|v| v.as_u64());
    let year = params.get("year").and_then(|v| v.as_i64());
    let from = params.get("dateFrom").and_then(|v| v.as_str());
    let to = params.get("dateTo").and_then(|v| v.as_str());

    match (month, year, from, to) {
        (Some(m), Some(y), _, _) => chrono::NaiveDate::from_ymd_opt(y as i32, m as u32, 1)
            .map(|d| d.format("%B %Y").to_string()),
        (None, Some(y), _, _) => Some(y.to_string()),
        (_, _, Some(from), Some(to)) => Some(format!("{} to {}", from, to)),
        (_, _, Some(from), None) => Some(format!("the period from {}", from)),
        _ => None,
    }
}

/// User-safe reply for a failed LLM call. The error detail is logged, not shown.
pub fn apology(error: &LlmError) -> String {
    let reason = match error {
        LlmError::MissingCredential(_) | LlmError::Unauthorized => {
            "the answer service is not configured with valid credentials"
        }
        LlmError::Disabled => "answer generation is turned off on this server",
        LlmError::Timeout(_) => "the answer service took too long to respond",
        LlmError::RateLimited => "the answer service is receiving too many requests right now",
        LlmError::Network(_) => "the answer service could not be reached",
        LlmError::Api { .. } => "the answer service returned an error",
        LlmError::MalformedResponse(_) => "the answer service returned an unreadable response",
    };
    format!(
        "I'm sorry, I found data for your question but couldn't generate an answer because {}. \
         Please try again shortly. The sources below show what was looked up.",
        reason
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, serde_json::Value)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_no_data_answer_names_causes() {
        let answer = no_data_answer(&[]);
        assert!(answer.starts_with("I couldn't find any records"));
        assert!(answer.contains("misspelled"));
        assert!(answer.contains("not been uploaded"));
        assert!(answer.contains("time period"));
    }

    #[test]
    fn test_no_data_answer_mentions_name_and_period() {
        let p = params(&[
            ("organizationId", json!("org-a")),
            ("propertyName", json!("Nonexistent Villa")),
            ("month", json!(3)),
            ("year", json!(2025)),
        ]);
        let answer = no_data_answer(&[&p]);
        assert!(answer.contains("for \"Nonexistent Villa\" in March 2025."));
    }

    #[test]
    fn test_period_from_date_range() {
        let p = params(&[("dateFrom", json!("2025-01-01")), ("dateTo", json!("2025-01-31"))]);
        assert_eq!(describe_period(&p).as_deref(), Some("2025-01-01 to 2025-01-31"));
        assert_eq!(describe_period(&params(&[])), None);
    }

    #[test]
    fn test_apology_hides_detail() {
        let text = apology(&LlmError::Api {
            status: 500,
            body: "secret upstream trace".into(),
        });
        assert!(text.starts_with("I'm sorry"));
        assert!(!text.contains("secret"));
        assert!(apology(&LlmError::RateLimited).contains("too many requests"));
        assert!(apology(&LlmError::Timeout(Duration::from_secs(1))).contains("too long"));
    }
}
