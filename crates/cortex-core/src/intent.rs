//! Intent detection.
//!
//! Classifies a free-text question into one of a closed set of
//! [`QueryType`]s by counting whole-word keyword hits per domain. The
//! detector is deterministic and total: a question with no recognised
//! keyword is [`QueryType::Unknown`] with low confidence, never an error.

use serde::{Deserialize, Serialize};

/// The coarse category of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    PropertyQuery,
    UtilityQuery,
    TaskQuery,
    BookingQuery,
    FinanceQuery,
    Unknown,
}

impl QueryType {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryType::PropertyQuery => "property_query",
            QueryType::UtilityQuery => "utility_query",
            QueryType::TaskQuery => "task_query",
            QueryType::BookingQuery => "booking_query",
            QueryType::FinanceQuery => "finance_query",
            QueryType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`detect`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedIntent {
    #[serde(rename = "type")]
    pub query_type: QueryType,
    /// In `[0, 1]`.
    pub confidence: f64,
}

const UNKNOWN_CONFIDENCE: f64 = 0.1;

/// Keyword vocabulary per domain, listed in tie-break priority order:
/// when two domains score equally the earlier (more specific) one wins,
/// so "finances for Villa X" is a finance question, not a property one.
const KEYWORDS: &[(QueryType, &[&str])] = &[
    (
        QueryType::UtilityQuery,
        &[
            "utility", "utilities", "bill", "bills", "electricity", "electric", "power", "water",
            "internet", "wifi", "wi-fi", "gas", "pln", "pdam",
        ],
    ),
    (
        QueryType::TaskQuery,
        &[
            "task", "tasks", "todo", "to-do", "todos", "chore", "chores", "cleaning", "maintenance",
            "repair", "repairs", "assigned", "assignment",
        ],
    ),
    (
        QueryType::BookingQuery,
        &[
            "booking", "bookings", "booked", "reservation", "reservations", "guest", "guests",
            "check-in", "checkin", "check-ins", "check-out", "checkout", "stay", "stays",
            "occupancy", "arrival", "arrivals", "nights",
        ],
    ),
    (
        QueryType::FinanceQuery,
        &[
            "finance", "finances", "financial", "income", "expense", "expenses", "revenue",
            "profit", "payout", "payouts", "commission", "commissions", "cost", "costs", "earnings",
            "earned", "spent", "spending", "wages", "salary", "money",
        ],
    ),
    (
        QueryType::PropertyQuery,
        &[
            "property", "properties", "villa", "villas", "house", "houses", "apartment",
            "apartments", "unit", "units", "listing", "listings", "bedroom", "bedrooms",
        ],
    ),
];

/// Lower-cased word tokens; `-` is kept inside words ("check-in").
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '\''))
        .map(|w| w.trim_matches(|c| c == '-' || c == '\''))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Classify a question.
///
/// Confidence grows with the number of hits for the winning domain and
/// shrinks with the share of hits that went to competing domains.
pub fn detect(question: &str) -> DetectedIntent {
    let tokens = tokenize(question);

    let scores: Vec<(QueryType, usize)> = KEYWORDS
        .iter()
        .map(|(qt, words)| {
            let hits = tokens
                .iter()
                .filter(|t| words.contains(&t.as_str()))
                .count();
            (*qt, hits)
        })
        .collect();

    let total: usize = scores.iter().map(|(_, s)| s).sum();
    if total == 0 {
        return DetectedIntent {
            query_type: QueryType::Unknown,
            confidence: UNKNOWN_CONFIDENCE,
        };
    }

    // First maximum wins, which applies the priority order above.
    let mut best = scores[0];
    for &(qt, hits) in &scores[1..] {
        if hits > best.1 {
            best = (qt, hits);
        }
    }

    let strength = (0.5 + 0.15 * best.1 as f64).min(0.95);
    let share = best.1 as f64 / total as f64;
    let confidence = (strength * share).clamp(UNKNOWN_CONFIDENCE, 1.0);

    DetectedIntent {
        query_type: best.0,
        confidence: (confidence * 100.0).round() / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utility_question() {
        let intent = detect("What's the utility bill status for Villa Aruna in January 2025?");
        assert_eq!(intent.query_type, QueryType::UtilityQuery);
        assert!(intent.confidence > 0.5);
    }

    #[test]
    fn test_task_question() {
        let intent = detect("what tasks are pending");
        assert_eq!(intent.query_type, QueryType::TaskQuery);
    }

    #[test]
    fn test_booking_question() {
        let intent = detect("Which guests check-in next week?");
        assert_eq!(intent.query_type, QueryType::BookingQuery);
    }

    #[test]
    fn test_finance_beats_property_on_tie() {
        let intent = detect("Show me finances for Nonexistent Villa");
        assert_eq!(intent.query_type, QueryType::FinanceQuery);
    }

    #[test]
    fn test_property_question() {
        let intent = detect("How many bedrooms does each villa have?");
        assert_eq!(intent.query_type, QueryType::PropertyQuery);
    }

    #[test]
    fn test_unknown_is_low_confidence() {
        let intent = detect("hello there");
        assert_eq!(intent.query_type, QueryType::Unknown);
        assert!(intent.confidence <= 0.2);

        let empty = detect("");
        assert_eq!(empty.query_type, QueryType::Unknown);
    }

    #[test]
    fn test_substrings_do_not_match() {
        // "vegas" contains "gas" but is not a utility keyword.
        let intent = detect("vegas");
        assert_eq!(intent.query_type, QueryType::Unknown);
    }

    #[test]
    fn test_confidence_in_unit_range_and_deterministic() {
        let questions = [
            "bill bill bill bill bill bill bill bill",
            "income expenses villa tasks guests water",
            "?",
        ];
        for q in questions {
            let a = detect(q);
            let b = detect(q);
            assert_eq!(a, b);
            assert!((0.0..=1.0).contains(&a.confidence), "{}: {}", q, a.confidence);
        }
    }

    #[test]
    fn test_serializes_snake_case() {
        let json = serde_json::to_value(detect("tasks")).unwrap();
        assert_eq!(json["type"], "task_query");
    }
}
