//! Bulk import of JSON datasets.
//!
//! Loads a [`Dataset`] file (`{properties, utilityBills, tasks, bookings,
//! finances}`) and upserts every record in one transaction. This is the
//! only write path in the crate; the answer pipeline itself is read-only.

use anyhow::{bail, Context, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;

use cortex_core::models::Dataset;

use crate::config::Config;
use crate::db;

/// Per-table record counts written by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub properties: u64,
    pub utility_bills: u64,
    pub tasks: u64,
    pub bookings: u64,
    pub finances: u64,
}

impl ImportStats {
    pub fn total(&self) -> u64 {
        self.properties + self.utility_bills + self.tasks + self.bookings + self.finances
    }
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset file: {}", path.display()))?;
    let dataset: Dataset = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse dataset file: {}", path.display()))?;
    validate(&dataset)?;
    Ok(dataset)
}

fn validate(dataset: &Dataset) -> Result<()> {
    let orgs = dataset
        .properties
        .iter()
        .map(|r| r.organization_id.as_str())
        .chain(dataset.utility_bills.iter().map(|r| r.organization_id.as_str()))
        .chain(dataset.tasks.iter().map(|r| r.organization_id.as_str()))
        .chain(dataset.bookings.iter().map(|r| r.organization_id.as_str()))
        .chain(dataset.finances.iter().map(|r| r.organization_id.as_str()));
    for org in orgs {
        if org.trim().is_empty() {
            bail!("every record must carry a non-empty organizationId");
        }
    }
    for bill in &dataset.utility_bills {
        if !(1..=12).contains(&bill.bill_month) {
            bail!("utility bill {}: billMonth must be 1-12", bill.id);
        }
    }
    for booking in &dataset.bookings {
        if booking.check_out < booking.check_in {
            bail!("booking {}: checkOut is before checkIn", booking.id);
        }
    }
    Ok(())
}

/// CLI entry point for `cortex import`.
pub async fn run_import(config: &Config, path: &Path, dry_run: bool) -> Result<()> {
    let dataset = load_dataset(path)?;

    if dry_run {
        println!("import {} (dry-run)", path.display());
        println!("  records found: {}", dataset.len());
        return Ok(());
    }

    let pool = db::connect(config).await?;
    let stats = import_dataset(&pool, &dataset).await?;
    pool.close().await;

    println!("import {}", path.display());
    println!("  properties:    {}", stats.properties);
    println!("  utility bills: {}", stats.utility_bills);
    println!("  tasks:         {}", stats.tasks);
    println!("  bookings:      {}", stats.bookings);
    println!("  finances:      {}", stats.finances);
    println!("ok");

    Ok(())
}

/// Upsert all records of a dataset in a single transaction.
pub async fn import_dataset(pool: &SqlitePool, dataset: &Dataset) -> Result<ImportStats> {
    validate(dataset)?;

    let mut tx = pool.begin().await?;
    let mut stats = ImportStats::default();

    for p in &dataset.properties {
        sqlx::query(
            r#"
            INSERT INTO properties (organization_id, id, name, location, bedrooms, status)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(organization_id, id) DO UPDATE SET
                name = excluded.name,
                location = excluded.location,
                bedrooms = excluded.bedrooms,
                status = excluded.status
            "#,
        )
        .bind(&p.organization_id)
        .bind(p.id)
        .bind(&p.name)
        .bind(&p.location)
        .bind(p.bedrooms)
        .bind(&p.status)
        .execute(&mut *tx)
        .await?;
        stats.properties += 1;
    }

    for b in &dataset.utility_bills {
        sqlx::query(
            r#"
            INSERT INTO utility_bills (organization_id, id, property_id, utility_type, amount,
                                       bill_month, bill_year, due_date, payment_status, provider)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(organization_id, id) DO UPDATE SET
                property_id = excluded.property_id,
                utility_type = excluded.utility_type,
                amount = excluded.amount,
                bill_month = excluded.bill_month,
                bill_year = excluded.bill_year,
                due_date = excluded.due_date,
                payment_status = excluded.payment_status,
                provider = excluded.provider
            "#,
        )
        .bind(&b.organization_id)
        .bind(b.id)
        .bind(b.property_id)
        .bind(&b.utility_type)
        .bind(b.amount.to_decimal_string())
        .bind(i64::from(b.bill_month))
        .bind(i64::from(b.bill_year))
        .bind(b.due_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(&b.payment_status)
        .bind(&b.provider)
        .execute(&mut *tx)
        .await?;
        stats.utility_bills += 1;
    }

    stats.tasks = import_tasks(&mut tx, dataset).await?;
    stats.bookings = import_bookings(&mut tx, dataset).await?;
    stats.finances = import_finances(&mut tx, dataset).await?;

    tx.commit().await?;
    Ok(stats)
}

async fn import_tasks(tx: &mut Transaction<'_, Sqlite>, dataset: &Dataset) -> Result<u64> {
    let mut count = 0;
    for t in &dataset.tasks {
        sqlx::query(
            r#"
            INSERT INTO tasks (organization_id, id, property_id, title, description, status,
                               priority, assigned_to, due_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(organization_id, id) DO UPDATE SET
                property_id = excluded.property_id,
                title = excluded.title,
                description = excluded.description,
                status = excluded.status,
                priority = excluded.priority,
                assigned_to = excluded.assigned_to,
                due_date = excluded.due_date
            "#,
        )
        .bind(&t.organization_id)
        .bind(t.id)
        .bind(t.property_id)
        .bind(&t.title)
        .bind(&t.description)
        .bind(&t.status)
        .bind(&t.priority)
        .bind(&t.assigned_to)
        .bind(t.due_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .execute(&mut **tx)
        .await?;
        count += 1;
    }
    Ok(count)
}

async fn import_bookings(tx: &mut Transaction<'_, Sqlite>, dataset: &Dataset) -> Result<u64> {
    let mut count = 0;
    for b in &dataset.bookings {
        sqlx::query(
            r#"
            INSERT INTO bookings (organization_id, id, property_id, guest_name, check_in,
                                  check_out, status, total_amount, channel)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(organization_id, id) DO UPDATE SET
                property_id = excluded.property_id,
                guest_name = excluded.guest_name,
                check_in = excluded.check_in,
                check_out = excluded.check_out,
                status = excluded.status,
                total_amount = excluded.total_amount,
                channel = excluded.channel
            "#,
        )
        .bind(&b.organization_id)
        .bind(b.id)
        .bind(b.property_id)
        .bind(&b.guest_name)
        .bind(b.check_in.format("%Y-%m-%d").to_string())
        .bind(b.check_out.format("%Y-%m-%d").to_string())
        .bind(&b.status)
        .bind(b.total_amount.map(|m| m.to_decimal_string()))
        .bind(&b.channel)
        .execute(&mut **tx)
        .await?;
        count += 1;
    }
    Ok(count)
}

async fn import_finances(tx: &mut Transaction<'_, Sqlite>, dataset: &Dataset) -> Result<u64> {
    let mut count = 0;
    for f in &dataset.finances {
        sqlx::query(
            r#"
            INSERT INTO finances (organization_id, id, property_id, kind, category,
                                  description, amount, date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(organization_id, id) DO UPDATE SET
                property_id = excluded.property_id,
                kind = excluded.kind,
                category = excluded.category,
                description = excluded.description,
                amount = excluded.amount,
                date = excluded.date
            "#,
        )
        .bind(&f.organization_id)
        .bind(f.id)
        .bind(f.property_id)
        .bind(f.kind.as_str())
        .bind(&f.category)
        .bind(&f.description)
        .bind(f.amount.to_decimal_string())
        .bind(f.date.format("%Y-%m-%d").to_string())
        .execute(&mut **tx)
        .await?;
        count += 1;
    }
    Ok(count)
}
