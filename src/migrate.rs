use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create all tables and indexes. Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Dates are stored as `YYYY-MM-DD` text so they compare correctly as
/// strings; amounts are decimal text parsed into exact `Money` on read.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS properties (
            organization_id TEXT NOT NULL,
            id INTEGER NOT NULL,
            name TEXT NOT NULL,
            location TEXT,
            bedrooms INTEGER,
            status TEXT,
            PRIMARY KEY (organization_id, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS utility_bills (
            organization_id TEXT NOT NULL,
            id INTEGER NOT NULL,
            property_id INTEGER NOT NULL,
            utility_type TEXT NOT NULL,
            amount TEXT NOT NULL,
            bill_month INTEGER NOT NULL,
            bill_year INTEGER NOT NULL,
            due_date TEXT,
            payment_status TEXT NOT NULL DEFAULT 'pending',
            provider TEXT,
            PRIMARY KEY (organization_id, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            organization_id TEXT NOT NULL,
            id INTEGER NOT NULL,
            property_id INTEGER,
            title TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            priority TEXT,
            assigned_to TEXT,
            due_date TEXT,
            PRIMARY KEY (organization_id, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookings (
            organization_id TEXT NOT NULL,
            id INTEGER NOT NULL,
            property_id INTEGER NOT NULL,
            guest_name TEXT NOT NULL,
            check_in TEXT NOT NULL,
            check_out TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'confirmed',
            total_amount TEXT,
            channel TEXT,
            PRIMARY KEY (organization_id, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS finances (
            organization_id TEXT NOT NULL,
            id INTEGER NOT NULL,
            property_id INTEGER,
            kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
            category TEXT,
            description TEXT,
            amount TEXT NOT NULL,
            date TEXT NOT NULL,
            PRIMARY KEY (organization_id, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_utility_bills_property ON utility_bills(organization_id, property_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_property ON tasks(organization_id, property_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bookings_property ON bookings(organization_id, property_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_finances_date ON finances(organization_id, date DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
