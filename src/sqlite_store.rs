//! SQLite-backed [`Store`] implementation.
//!
//! Every query starts from `WHERE <table>.organization_id = ?` and the
//! property-name join is keyed on `(organization_id, id)`, so a record
//! owned by another tenant can never appear, even through the join.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use cortex_core::models::{Booking, FinanceKind, FinanceRecord, Property, Task, UtilityBill};
use cortex_core::money::Money;
use cortex_core::store::{
    BookingFilter, FinanceFilter, PropertyFilter, Store, TaskFilter, UtilityBillFilter,
};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid date: {}", raw))
}

fn parse_opt_date(raw: Option<String>) -> Result<Option<NaiveDate>> {
    raw.as_deref().map(parse_date).transpose()
}

fn parse_opt_money(raw: Option<String>) -> Result<Option<Money>> {
    raw.as_deref().map(Money::parse).transpose()
}

/// Narrow a query to one property by id, or by joined name when the id is
/// unresolved.
fn scope_property(
    qb: &mut QueryBuilder<'_, Sqlite>,
    column: &str,
    property_id: Option<i64>,
    property_name: Option<&str>,
) {
    if let Some(id) = property_id {
        qb.push(format!(" AND {} = ", column));
        qb.push_bind(id);
    } else if let Some(name) = property_name {
        qb.push(" AND instr(lower(p.name), lower(");
        qb.push_bind(name.to_string());
        qb.push(")) > 0");
    }
}

fn push_limit(qb: &mut QueryBuilder<'_, Sqlite>, limit: i64) {
    qb.push(" LIMIT ");
    qb.push_bind(limit.max(0));
}

fn row_to_property(row: &SqliteRow) -> Result<Property> {
    Ok(Property {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        name: row.try_get("name")?,
        location: row.try_get("location")?,
        bedrooms: row.try_get("bedrooms")?,
        status: row.try_get("status")?,
    })
}

fn row_to_utility_bill(row: &SqliteRow) -> Result<UtilityBill> {
    let amount: String = row.try_get("amount")?;
    let month: i64 = row.try_get("bill_month")?;
    let year: i64 = row.try_get("bill_year")?;
    Ok(UtilityBill {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        property_id: row.try_get("property_id")?,
        property_name: row.try_get("property_name")?,
        utility_type: row.try_get("utility_type")?,
        amount: Money::parse(&amount)?,
        bill_month: u32::try_from(month).context("bill_month out of range")?,
        bill_year: i32::try_from(year).context("bill_year out of range")?,
        due_date: parse_opt_date(row.try_get("due_date")?)?,
        payment_status: row.try_get("payment_status")?,
        provider: row.try_get("provider")?,
    })
}

fn row_to_task(row: &SqliteRow) -> Result<Task> {
    Ok(Task {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        property_id: row.try_get("property_id")?,
        property_name: row.try_get("property_name")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: row.try_get("status")?,
        priority: row.try_get("priority")?,
        assigned_to: row.try_get("assigned_to")?,
        due_date: parse_opt_date(row.try_get("due_date")?)?,
    })
}

fn row_to_booking(row: &SqliteRow) -> Result<Booking> {
    let check_in: String = row.try_get("check_in")?;
    let check_out: String = row.try_get("check_out")?;
    Ok(Booking {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        property_id: row.try_get("property_id")?,
        property_name: row.try_get("property_name")?,
        guest_name: row.try_get("guest_name")?,
        check_in: parse_date(&check_in)?,
        check_out: parse_date(&check_out)?,
        status: row.try_get("status")?,
        total_amount: parse_opt_money(row.try_get("total_amount")?)?,
        channel: row.try_get("channel")?,
    })
}

fn row_to_finance(row: &SqliteRow) -> Result<FinanceRecord> {
    let kind: String = row.try_get("kind")?;
    let amount: String = row.try_get("amount")?;
    let date: String = row.try_get("date")?;
    Ok(FinanceRecord {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        property_id: row.try_get("property_id")?,
        property_name: row.try_get("property_name")?,
        kind: FinanceKind::parse(&kind)
            .ok_or_else(|| anyhow::anyhow!("invalid finance kind: {}", kind))?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        amount: Money::parse(&amount)?,
        date: parse_date(&date)?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn fetch_properties(&self, filter: &PropertyFilter) -> Result<Vec<Property>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, organization_id, name, location, bedrooms, status \
             FROM properties WHERE organization_id = ",
        );
        qb.push_bind(filter.organization_id.clone());
        if let Some(id) = filter.property_id {
            qb.push(" AND id = ");
            qb.push_bind(id);
        }
        if let Some(ref name) = filter.name {
            qb.push(" AND instr(lower(name), lower(");
            qb.push_bind(name.clone());
            qb.push(")) > 0");
        }
        qb.push(" ORDER BY name ASC, id ASC");
        push_limit(&mut qb, filter.limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_property).collect()
    }

    async fn fetch_utility_bills(&self, filter: &UtilityBillFilter) -> Result<Vec<UtilityBill>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT b.id, b.organization_id, b.property_id, p.name AS property_name, \
                    b.utility_type, b.amount, b.bill_month, b.bill_year, b.due_date, \
                    b.payment_status, b.provider \
             FROM utility_bills b \
             LEFT JOIN properties p ON p.organization_id = b.organization_id AND p.id = b.property_id \
             WHERE b.organization_id = ",
        );
        qb.push_bind(filter.organization_id.clone());
        scope_property(
            &mut qb,
            "b.property_id",
            filter.property_id,
            filter.property_name.as_deref(),
        );
        if let Some(ref utility_type) = filter.utility_type {
            qb.push(" AND lower(b.utility_type) = lower(");
            qb.push_bind(utility_type.clone());
            qb.push(")");
        }
        if let Some(ref status) = filter.payment_status {
            qb.push(" AND lower(b.payment_status) = lower(");
            qb.push_bind(status.clone());
            qb.push(")");
        }
        if let Some(month) = filter.month {
            qb.push(" AND b.bill_month = ");
            qb.push_bind(i64::from(month));
        }
        if let Some(year) = filter.year {
            qb.push(" AND b.bill_year = ");
            qb.push_bind(i64::from(year));
        }
        qb.push(" ORDER BY b.bill_year DESC, b.bill_month DESC, b.id ASC");
        push_limit(&mut qb, filter.limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_utility_bill).collect()
    }

    async fn fetch_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT t.id, t.organization_id, t.property_id, p.name AS property_name, \
                    t.title, t.description, t.status, t.priority, t.assigned_to, t.due_date \
             FROM tasks t \
             LEFT JOIN properties p ON p.organization_id = t.organization_id AND p.id = t.property_id \
             WHERE t.organization_id = ",
        );
        qb.push_bind(filter.organization_id.clone());
        scope_property(
            &mut qb,
            "t.property_id",
            filter.property_id,
            filter.property_name.as_deref(),
        );
        if let Some(ref status) = filter.status {
            qb.push(" AND lower(t.status) = lower(");
            qb.push_bind(status.clone());
            qb.push(")");
        }
        if let Some(from) = filter.date_from {
            qb.push(" AND t.due_date >= ");
            qb.push_bind(from.format("%Y-%m-%d").to_string());
        }
        if let Some(to) = filter.date_to {
            qb.push(" AND t.due_date <= ");
            qb.push_bind(to.format("%Y-%m-%d").to_string());
        }
        // NULL due dates sort last under DESC in SQLite.
        qb.push(" ORDER BY t.due_date DESC, t.id ASC");
        push_limit(&mut qb, filter.limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_task).collect()
    }

    async fn fetch_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT b.id, b.organization_id, b.property_id, p.name AS property_name, \
                    b.guest_name, b.check_in, b.check_out, b.status, b.total_amount, b.channel \
             FROM bookings b \
             LEFT JOIN properties p ON p.organization_id = b.organization_id AND p.id = b.property_id \
             WHERE b.organization_id = ",
        );
        qb.push_bind(filter.organization_id.clone());
        scope_property(
            &mut qb,
            "b.property_id",
            filter.property_id,
            filter.property_name.as_deref(),
        );
        if let Some(ref status) = filter.status {
            qb.push(" AND lower(b.status) = lower(");
            qb.push_bind(status.clone());
            qb.push(")");
        }
        // Stay overlaps the window.
        if let Some(to) = filter.date_to {
            qb.push(" AND b.check_in <= ");
            qb.push_bind(to.format("%Y-%m-%d").to_string());
        }
        if let Some(from) = filter.date_from {
            qb.push(" AND b.check_out >= ");
            qb.push_bind(from.format("%Y-%m-%d").to_string());
        }
        qb.push(" ORDER BY b.check_in DESC, b.id ASC");
        push_limit(&mut qb, filter.limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_booking).collect()
    }

    async fn fetch_finances(&self, filter: &FinanceFilter) -> Result<Vec<FinanceRecord>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT f.id, f.organization_id, f.property_id, p.name AS property_name, \
                    f.kind, f.category, f.description, f.amount, f.date \
             FROM finances f \
             LEFT JOIN properties p ON p.organization_id = f.organization_id AND p.id = f.property_id \
             WHERE f.organization_id = ",
        );
        qb.push_bind(filter.organization_id.clone());
        scope_property(
            &mut qb,
            "f.property_id",
            filter.property_id,
            filter.property_name.as_deref(),
        );
        if let Some(kind) = filter.finance_type {
            qb.push(" AND f.kind = ");
            qb.push_bind(kind.as_str());
        }
        if let Some(from) = filter.date_from {
            qb.push(" AND f.date >= ");
            qb.push_bind(from.format("%Y-%m-%d").to_string());
        }
        if let Some(to) = filter.date_to {
            qb.push(" AND f.date <= ");
            qb.push_bind(to.format("%Y-%m-%d").to_string());
        }
        qb.push(" ORDER BY f.date DESC, f.id ASC");
        push_limit(&mut qb, filter.limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_finance).collect()
    }
}
