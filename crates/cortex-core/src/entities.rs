//! Entity extraction.
//!
//! Pulls structured filter fields out of a question: property name, month,
//! year, explicit ISO dates, a status word, a utility type, and a finance
//! direction. Fields the extractor is not confident about stay `None`;
//! malformed values (e.g. `2025-02-30`) are dropped, never passed through.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::intent::tokenize;
use crate::models::FinanceKind;

/// Structured fields extracted from a question.
///
/// `property_id` is never set by [`extract`]; it is filled in by the
/// grounder when the property name resolves to exactly one property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedEntities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utility_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finance_type: Option<FinanceKind>,
}

impl ExtractedEntities {
    /// Returns a copy with `property_id` set.
    pub fn with_property_id(&self, id: i64) -> Self {
        Self {
            property_id: Some(id),
            ..self.clone()
        }
    }

    /// Inclusive date window implied by the entities.
    ///
    /// Explicit dates win; otherwise month+year gives that calendar month
    /// and a bare year gives that calendar year. A month without a year
    /// implies nothing.
    pub fn date_range(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        if self.date_from.is_some() || self.date_to.is_some() {
            return (self.date_from, self.date_to);
        }
        match (self.month, self.year) {
            (Some(m), Some(y)) => match month_bounds(y, m) {
                Some((start, end)) => (Some(start), Some(end)),
                None => (None, None),
            },
            (None, Some(y)) => (
                NaiveDate::from_ymd_opt(y, 1, 1),
                NaiveDate::from_ymd_opt(y, 12, 31),
            ),
            _ => (None, None),
        }
    }
}

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, next.pred_opt()?))
}

const MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

/// Short forms double as ordinary words and names ("Mar", "Jan"), so they
/// only count as months next to a number or when nothing else is a month.
const MONTH_ABBREVIATIONS: &[(&str, u32)] = &[
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("sept", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

/// Surface word → canonical status.
const STATUSES: &[(&str, &str)] = &[
    ("pending", "pending"),
    ("unpaid", "pending"),
    ("outstanding", "pending"),
    ("paid", "paid"),
    ("overdue", "overdue"),
    ("late", "overdue"),
    ("completed", "completed"),
    ("complete", "completed"),
    ("done", "completed"),
    ("finished", "completed"),
    ("in-progress", "in_progress"),
    ("ongoing", "in_progress"),
    ("cancelled", "cancelled"),
    ("canceled", "cancelled"),
    ("confirmed", "confirmed"),
];

const UTILITY_TYPES: &[(&str, &str)] = &[
    ("electricity", "electricity"),
    ("electric", "electricity"),
    ("power", "electricity"),
    ("pln", "electricity"),
    ("water", "water"),
    ("pdam", "water"),
    ("internet", "internet"),
    ("wifi", "internet"),
    ("wi-fi", "internet"),
    ("gas", "gas"),
];

const INCOME_WORDS: &[&str] = &["income", "revenue", "earnings", "earned", "payout", "payouts"];
const EXPENSE_WORDS: &[&str] = &[
    "expense", "expenses", "cost", "costs", "spent", "spending", "wages", "salary",
];

/// Capitalised words that start a sentence or a question and are never a
/// property name on their own.
const NAME_STOPWORDS: &[&str] = &[
    "i", "what", "what's", "whats", "which", "who", "how", "show", "list", "give", "tell", "is",
    "are", "the", "a", "an", "my", "our", "all", "any", "this", "last", "next", "today",
    "tomorrow", "yesterday", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday",
    "sunday",
];

/// Prepositions after which a property name typically appears.
const NAME_ANCHORS: &[&str] = &["for", "at", "in", "of", "about", "from"];

fn lookup(table: &[(&str, u32)], word: &str) -> Option<u32> {
    let w = word.to_lowercase();
    table.iter().find(|(name, _)| *name == w).map(|(_, m)| *m)
}

fn is_day(word: &str) -> bool {
    let digits = ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| word.strip_suffix(*suffix))
        .unwrap_or(word);
    digits.len() <= 2
        && digits
            .parse::<u32>()
            .is_ok_and(|d| (1..=31).contains(&d))
}

fn is_year(word: &str) -> Option<i32> {
    if word.len() != 4 || !word.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let y: i32 = word.parse().ok()?;
    (1900..=2100).contains(&y).then_some(y)
}

/// Extract entities from a question.
pub fn extract(question: &str) -> ExtractedEntities {
    let tokens = tokenize(question);
    let mut entities = ExtractedEntities::default();

    entities.property_name = extract_property_name(question);

    // "in progress" is two words; fold it before the per-token pass.
    let lowered = question.to_lowercase();
    if lowered.contains("in progress") {
        entities.status = Some("in_progress".to_string());
    }

    let name_span = entities
        .property_name
        .as_deref()
        .and_then(|name| token_span(&tokens, &tokenize(name)));
    entities.month = extract_month(&tokens, name_span);

    for token in &tokens {
        if entities.year.is_none() {
            entities.year = is_year(token);
        }
        if entities.status.is_none() {
            if let Some((_, canonical)) = STATUSES.iter().find(|(w, _)| w == token) {
                entities.status = Some(canonical.to_string());
            }
        }
        if entities.utility_type.is_none() {
            if let Some((_, canonical)) = UTILITY_TYPES.iter().find(|(w, _)| w == token) {
                entities.utility_type = Some(canonical.to_string());
            }
        }
    }

    let wants_income = tokens.iter().any(|t| INCOME_WORDS.contains(&t.as_str()));
    let wants_expense = tokens.iter().any(|t| EXPENSE_WORDS.contains(&t.as_str()));
    entities.finance_type = match (wants_income, wants_expense) {
        (true, false) => Some(FinanceKind::Income),
        (false, true) => Some(FinanceKind::Expense),
        _ => None,
    };

    let dates = extract_iso_dates(question);
    entities.date_from = dates.first().copied();
    entities.date_to = dates.get(1).copied();
    if let (Some(from), Some(to)) = (entities.date_from, entities.date_to) {
        if to < from {
            entities.date_from = Some(to);
            entities.date_to = Some(from);
        }
    }

    // A date implies its year when none was named separately.
    if entities.year.is_none() {
        entities.year = entities.date_from.map(|d| d.year());
    }

    entities
}

/// Position of `needle` as a contiguous run inside `tokens`.
fn token_span(tokens: &[String], needle: &[String]) -> Option<Range<usize>> {
    if needle.is_empty() {
        return None;
    }
    tokens
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|start| start..start + needle.len())
}

/// Month named in the question, ignoring words that belong to the property
/// name. A full month name wins over a short form; a short form counts when
/// it sits next to a year or day number, or is the only month word present.
/// "may" is also a modal verb and always needs a number beside it.
fn extract_month(tokens: &[String], name_span: Option<Range<usize>>) -> Option<u32> {
    let beside_number = |i: usize| {
        let neighbours = [i.checked_sub(1), Some(i + 1)];
        neighbours
            .into_iter()
            .flatten()
            .filter_map(|j| tokens.get(j))
            .any(|t| is_year(t).is_some() || is_day(t))
    };

    let candidates = tokens
        .iter()
        .enumerate()
        .filter(|(i, _)| !name_span.as_ref().is_some_and(|span| span.contains(i)));

    let mut full = None;
    let mut short_beside_number = None;
    let mut short_forms = Vec::new();
    for (i, token) in candidates {
        if let Some(m) = lookup(MONTHS, token) {
            if full.is_none() && (token != "may" || beside_number(i)) {
                full = Some(m);
            }
        } else if let Some(m) = lookup(MONTH_ABBREVIATIONS, token) {
            if short_beside_number.is_none() && beside_number(i) {
                short_beside_number = Some(m);
            }
            short_forms.push(m);
        }
    }

    full.or(short_beside_number)
        .or(match short_forms.as_slice() {
            [only] => Some(*only),
            _ => None,
        })
}

/// Finds `YYYY-MM-DD` substrings that are real calendar dates.
fn extract_iso_dates(text: &str) -> Vec<NaiveDate> {
    text.split(|c: char| !(c.is_ascii_digit() || c == '-'))
        .filter(|w| w.len() == 10)
        .filter_map(|w| NaiveDate::parse_from_str(w, "%Y-%m-%d").ok())
        .collect()
}

/// Property name: a quoted phrase, or the run of capitalised words after a
/// preposition ("for Villa Aruna in January" → "Villa Aruna").
fn extract_property_name(question: &str) -> Option<String> {
    if let Some(quoted) = quoted_phrase(question) {
        return Some(quoted);
    }

    let words: Vec<&str> = question.split_whitespace().collect();
    for (i, word) in words.iter().enumerate() {
        let anchor = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
        if !NAME_ANCHORS.contains(&anchor.as_str()) {
            continue;
        }

        // "for the Villa Aruna": a lowercase article is not part of the name.
        let mut rest = &words[i + 1..];
        if let Some((first, tail)) = rest.split_first() {
            if ["the", "a", "an"].contains(first) {
                rest = tail;
            }
        }

        let mut name_parts: Vec<&str> = Vec::new();
        for (j, candidate) in rest.iter().enumerate() {
            let ends_clause = candidate.ends_with(|c: char| matches!(c, ',' | '?' | '.' | '!' | ';'));
            let clean = candidate.trim_matches(|c: char| !(c.is_alphanumeric() || c == '\''));
            if !is_name_word(clean) {
                break;
            }
            // "for Oct 2024": a short month before a number is a date.
            let next_is_number = rest.get(j + 1).is_some_and(|next| {
                let next = next.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
                is_year(&next).is_some() || is_day(&next)
            });
            if next_is_number && lookup(MONTH_ABBREVIATIONS, clean).is_some() {
                break;
            }
            name_parts.push(clean);
            if ends_clause {
                break;
            }
        }

        if !name_parts.is_empty() {
            return Some(name_parts.join(" "));
        }
    }

    None
}

fn is_name_word(word: &str) -> bool {
    let Some(first) = word.chars().next() else {
        return false;
    };
    first.is_uppercase()
        && lookup(MONTHS, word).is_none()
        && !NAME_STOPWORDS.contains(&word.to_lowercase().as_str())
}

fn quoted_phrase(text: &str) -> Option<String> {
    for quote in ['"', '\u{201c}'] {
        let close = if quote == '"' { '"' } else { '\u{201d}' };
        if let Some(start) = text.find(quote) {
            let rest = &text[start + quote.len_utf8()..];
            if let Some(end) = rest.find(close) {
                let inner = rest[..end].trim();
                if !inner.is_empty() {
                    return Some(inner.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utility_question_entities() {
        let e = extract("What's the utility bill status for Villa Aruna in January 2025?");
        assert_eq!(e.property_name.as_deref(), Some("Villa Aruna"));
        assert_eq!(e.month, Some(1));
        assert_eq!(e.year, Some(2025));
        assert_eq!(e.status, None);
        assert_eq!(e.utility_type, None);
        assert_eq!(e.property_id, None);
    }

    #[test]
    fn test_name_at_end_of_question() {
        let e = extract("Show me finances for Nonexistent Villa");
        assert_eq!(e.property_name.as_deref(), Some("Nonexistent Villa"));
        assert_eq!(e.finance_type, None);
    }

    #[test]
    fn test_quoted_name_wins() {
        let e = extract("bookings at \"casa del mar\" in March 2024");
        assert_eq!(e.property_name.as_deref(), Some("casa del mar"));
        assert_eq!(e.month, Some(3));
        assert_eq!(e.year, Some(2024));
    }

    #[test]
    fn test_month_is_not_a_property_name() {
        let e = extract("expenses in February 2025");
        assert_eq!(e.property_name, None);
        assert_eq!(e.month, Some(2));
        assert_eq!(e.finance_type, Some(FinanceKind::Expense));
    }

    #[test]
    fn test_status_and_utility_type() {
        let e = extract("which electricity bills are overdue?");
        assert_eq!(e.utility_type.as_deref(), Some("electricity"));
        assert_eq!(e.status.as_deref(), Some("overdue"));

        let e = extract("what tasks are pending");
        assert_eq!(e.status.as_deref(), Some("pending"));

        let e = extract("tasks in progress for Villa Melati");
        assert_eq!(e.status.as_deref(), Some("in_progress"));
        assert_eq!(e.property_name.as_deref(), Some("Villa Melati"));
    }

    #[test]
    fn test_may_needs_a_year() {
        assert_eq!(extract("may I see the tasks").month, None);
        assert_eq!(extract("income for May 2024").month, Some(5));
    }

    #[test]
    fn test_month_inside_property_name_is_ignored() {
        let e = extract("water bill for \"Casa del Mar\" in June 2024");
        assert_eq!(e.property_name.as_deref(), Some("Casa del Mar"));
        assert_eq!(e.month, Some(6));
        assert_eq!(e.year, Some(2024));

        let e = extract("water bill for Casa Del Mar in June 2024");
        assert_eq!(e.property_name.as_deref(), Some("Casa Del Mar"));
        assert_eq!(e.month, Some(6));
    }

    #[test]
    fn test_full_month_beats_short_form() {
        assert_eq!(extract("tasks assigned to Jan in October 2025").month, Some(10));
        assert_eq!(extract("tasks assigned to Jan and Dec").month, None);
    }

    #[test]
    fn test_short_month_next_to_a_number() {
        let e = extract("expenses for Oct 2024");
        assert_eq!(e.month, Some(10));
        assert_eq!(e.property_name, None);
        assert_eq!(extract("bookings on 3rd Mar").month, Some(3));
        assert_eq!(extract("bills due in dec").month, Some(12));
    }

    #[test]
    fn test_leading_article_before_name() {
        let e = extract("bookings for the Villa Aruna in March 2025");
        assert_eq!(e.property_name.as_deref(), Some("Villa Aruna"));
        assert_eq!(e.month, Some(3));
        assert_eq!(extract("tasks in the kitchen").property_name, None);
    }

    #[test]
    fn test_iso_dates() {
        let e = extract("bookings between 2025-03-10 and 2025-03-01");
        assert_eq!(e.date_from, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(e.date_to, NaiveDate::from_ymd_opt(2025, 3, 10));
        assert_eq!(e.year, Some(2025));
    }

    #[test]
    fn test_malformed_date_is_omitted() {
        let e = extract("bookings on 2025-02-30");
        assert_eq!(e.date_from, None);
        assert_eq!(e.date_to, None);
    }

    #[test]
    fn test_both_finance_directions_leave_type_unset() {
        let e = extract("income and expenses last year");
        assert_eq!(e.finance_type, None);
    }

    #[test]
    fn test_nothing_found() {
        assert_eq!(extract(""), ExtractedEntities::default());
        assert_eq!(extract("hello"), ExtractedEntities::default());
    }

    #[test]
    fn test_date_range_from_month_and_year() {
        let e = ExtractedEntities {
            month: Some(2),
            year: Some(2024),
            ..Default::default()
        };
        assert_eq!(
            e.date_range(),
            (
                NaiveDate::from_ymd_opt(2024, 2, 1),
                NaiveDate::from_ymd_opt(2024, 2, 29)
            )
        );

        let december = ExtractedEntities {
            month: Some(12),
            year: Some(2025),
            ..Default::default()
        };
        assert_eq!(december.date_range().1, NaiveDate::from_ymd_opt(2025, 12, 31));

        let month_only = ExtractedEntities {
            month: Some(5),
            ..Default::default()
        };
        assert_eq!(month_only.date_range(), (None, None));
    }

    #[test]
    fn test_with_property_id_copies() {
        let e = extract("tasks for Villa Aruna");
        let resolved = e.with_property_id(7);
        assert_eq!(resolved.property_id, Some(7));
        assert_eq!(e.property_id, None);
        assert_eq!(resolved.property_name, e.property_name);
    }
}
