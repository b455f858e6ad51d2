//! Renders [`GroundedData`] as a flat text block for the LLM.
//!
//! One labeled section per populated domain, one line per record. Names
//! lead each line; internal ids appear only in parentheses. Finance
//! sections end with exact totals computed from the same records.
//!
//! When nothing was found the output is exactly [`NO_DATA_SENTINEL`], so
//! callers can branch on string equality.

use chrono::NaiveDate;

use crate::grounding::GroundedData;
use crate::models::{Booking, FinanceKind, FinanceRecord, Property, Task, UtilityBill};
use crate::money::Money;

/// Returned by [`normalize`] when no domain holds a record.
pub const NO_DATA_SENTINEL: &str = "NO_RELEVANT_DATA_FOUND";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Render grounded data. Pure and deterministic.
pub fn normalize(data: &GroundedData) -> String {
    let mut sections: Vec<String> = Vec::new();

    if let Some(properties) = non_empty(&data.properties) {
        sections.push(section("PROPERTIES", properties, property_line));
    }
    if let Some(bills) = non_empty(&data.utility_bills) {
        sections.push(section("UTILITY BILLS", bills, utility_bill_line));
    }
    if let Some(tasks) = non_empty(&data.tasks) {
        sections.push(section("TASKS", tasks, task_line));
    }
    if let Some(bookings) = non_empty(&data.bookings) {
        sections.push(section("BOOKINGS", bookings, booking_line));
    }
    if let Some(finances) = non_empty(&data.finances) {
        let mut text = section("FINANCES", finances, finance_line);
        text.push('\n');
        text.push_str(&finance_totals(finances));
        sections.push(text);
    }

    if sections.is_empty() {
        return NO_DATA_SENTINEL.to_string();
    }
    sections.join("\n\n")
}

fn non_empty<T>(records: &Option<Vec<T>>) -> Option<&[T]> {
    records.as_deref().filter(|r| !r.is_empty())
}

fn section<T>(label: &str, records: &[T], line: fn(&T) -> String) -> String {
    let mut out = format!("{} ({}):", label, records.len());
    for record in records {
        out.push_str("\n- ");
        out.push_str(&line(record));
    }
    out
}

/// "January 5, 2025"
fn human_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("Unknown month")
}

fn status_text(status: &str) -> String {
    status.replace('_', " ")
}

fn property_line(p: &Property) -> String {
    let mut line = p.name.clone();
    if let Some(ref location) = p.location {
        line.push_str(&format!(", {}", location));
    }
    if let Some(bedrooms) = p.bedrooms {
        line.push_str(&format!(", {} bedrooms", bedrooms));
    }
    if let Some(ref status) = p.status {
        line.push_str(&format!(", status {}", status_text(status)));
    }
    line.push_str(&format!(" (id {})", p.id));
    line
}

fn utility_bill_line(b: &UtilityBill) -> String {
    let owner = b.property_name.as_deref().unwrap_or("Unknown property");
    let mut line = format!(
        "{}: {} bill for {} {}, amount {}, status {}",
        owner,
        b.utility_type,
        month_name(b.bill_month),
        b.bill_year,
        b.amount.display(),
        status_text(&b.payment_status),
    );
    if let Some(due) = b.due_date {
        line.push_str(&format!(", due {}", human_date(due)));
    }
    if let Some(ref provider) = b.provider {
        line.push_str(&format!(", provider {}", provider));
    }
    line.push_str(&format!(" (id {})", b.id));
    line
}

fn task_line(t: &Task) -> String {
    let mut line = format!("{} [{}]", t.title, status_text(&t.status));
    if let Some(ref name) = t.property_name {
        line.push_str(&format!(", property {}", name));
    }
    if let Some(ref priority) = t.priority {
        line.push_str(&format!(", priority {}", priority));
    }
    if let Some(due) = t.due_date {
        line.push_str(&format!(", due {}", human_date(due)));
    }
    if let Some(ref who) = t.assigned_to {
        line.push_str(&format!(", assigned to {}", who));
    }
    if let Some(ref description) = t.description {
        line.push_str(&format!(": {}", description));
    }
    line.push_str(&format!(" (id {})", t.id));
    line
}

fn booking_line(b: &Booking) -> String {
    let owner = b.property_name.as_deref().unwrap_or("Unknown property");
    let mut line = format!(
        "{} at {}, {} to {} ({} nights), status {}",
        b.guest_name,
        owner,
        human_date(b.check_in),
        human_date(b.check_out),
        b.nights(),
        status_text(&b.status),
    );
    if let Some(total) = b.total_amount {
        line.push_str(&format!(", total {}", total.display()));
    }
    if let Some(ref channel) = b.channel {
        line.push_str(&format!(", via {}", channel));
    }
    line.push_str(&format!(" (id {})", b.id));
    line
}

fn finance_line(f: &FinanceRecord) -> String {
    let mut line = format!(
        "{}: {} {}",
        human_date(f.date),
        f.kind.as_str(),
        f.amount.display()
    );
    if let Some(ref category) = f.category {
        line.push_str(&format!(" ({})", category));
    }
    if let Some(ref name) = f.property_name {
        line.push_str(&format!(", property {}", name));
    }
    if let Some(ref description) = f.description {
        line.push_str(&format!(", {}", description));
    }
    line.push_str(&format!(" (id {})", f.id));
    line
}

/// Exact totals over the records passed in.
fn finance_totals(records: &[FinanceRecord]) -> String {
    let total_of = |kind: FinanceKind| -> Money {
        records
            .iter()
            .filter(|f| f.kind == kind)
            .map(|f| f.amount)
            .sum()
    };
    let income = total_of(FinanceKind::Income);
    let expenses = total_of(FinanceKind::Expense);
    format!(
        "Total income: {}\nTotal expenses: {}\nNet profit: {}",
        income.display(),
        expenses.display(),
        (income - expenses).display()
    )
}
