//! SQLite store tests: import, tenant scoping, and filters.

use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use captain_cortex::config::Config;
use captain_cortex::cortex::Cortex;
use captain_cortex::import::{import_dataset, load_dataset};
use captain_cortex::llm::DisabledProvider;
use captain_cortex::sqlite_store::SqliteStore;
use captain_cortex::{db, migrate};
use cortex_core::models::FinanceKind;
use cortex_core::money::Money;
use cortex_core::store::{
    BookingFilter, FinanceFilter, PropertyFilter, Store, TaskFilter, UtilityBillFilter,
};

fn sample_path() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data/sample-dataset.json"))
}

async fn seeded_store(tmp: &TempDir) -> (Config, SqliteStore) {
    let config = Config::with_db_path(tmp.path().join("data").join("cortex.sqlite"));
    let pool = db::connect(&config).await.unwrap();
    migrate::apply(&pool).await.unwrap();

    let dataset = load_dataset(sample_path()).unwrap();
    let stats = import_dataset(&pool, &dataset).await.unwrap();
    assert_eq!(stats.total() as usize, dataset.len());

    (config, SqliteStore::new(pool))
}

#[tokio::test]
async fn test_import_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let (_config, store) = seeded_store(&tmp).await;

    let dataset = load_dataset(sample_path()).unwrap();
    import_dataset(store.pool(), &dataset).await.unwrap();

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM properties")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count as usize, dataset.properties.len());
}

#[tokio::test]
async fn test_queries_are_tenant_scoped() {
    let tmp = TempDir::new().unwrap();
    let (_config, store) = seeded_store(&tmp).await;

    let properties = store
        .fetch_properties(&PropertyFilter {
            organization_id: "org-demo".into(),
            name: Some("villa aruna".into()),
            limit: 50,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(properties.len(), 1);
    assert_eq!(properties[0].location.as_deref(), Some("Canggu, Bali"));

    let bills = store
        .fetch_utility_bills(&UtilityBillFilter {
            organization_id: "org-demo".into(),
            property_id: Some(1),
            month: Some(1),
            year: Some(2025),
            limit: 50,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(bills.len(), 1);
    assert_eq!(bills[0].amount, Money::from_cents(125_000));
    assert_eq!(bills[0].property_name.as_deref(), Some("Villa Aruna"));

    let other = store
        .fetch_tasks(&TaskFilter {
            organization_id: "org-other".into(),
            limit: 50,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(other.len(), 1);
    assert!(other.iter().all(|t| t.organization_id == "org-other"));
}

#[tokio::test]
async fn test_task_status_and_record_cap() {
    let tmp = TempDir::new().unwrap();
    let (_config, store) = seeded_store(&tmp).await;

    let pending = store
        .fetch_tasks(&TaskFilter {
            organization_id: "org-demo".into(),
            status: Some("pending".into()),
            limit: 50,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|t| t.status == "pending"));
    // Newest due date first.
    assert_eq!(pending[0].title, "Repaint balcony railing");

    let capped = store
        .fetch_tasks(&TaskFilter {
            organization_id: "org-demo".into(),
            limit: 1,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(capped.len(), 1);
}

#[tokio::test]
async fn test_booking_overlap_and_finance_filters() {
    let tmp = TempDir::new().unwrap();
    let (_config, store) = seeded_store(&tmp).await;

    let january = |d: u32| chrono::NaiveDate::from_ymd_opt(2025, 1, d);
    let bookings = store
        .fetch_bookings(&BookingFilter {
            organization_id: "org-demo".into(),
            date_from: january(1),
            date_to: january(31),
            limit: 50,
            ..Default::default()
        })
        .await
        .unwrap();
    // Ana's stay, and Chen's stay that starts in January and ends in February.
    let guests: Vec<&str> = bookings.iter().map(|b| b.guest_name.as_str()).collect();
    assert_eq!(guests.len(), 2);
    assert!(guests.contains(&"Ana Costa"));
    assert!(guests.contains(&"Chen Li"));

    let expenses = store
        .fetch_finances(&FinanceFilter {
            organization_id: "org-demo".into(),
            finance_type: Some(FinanceKind::Expense),
            limit: 50,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].amount, Money::from_cents(45_025));

    let unknown = store
        .fetch_finances(&FinanceFilter {
            organization_id: "org-demo".into(),
            property_name: Some("Nonexistent Villa".into()),
            limit: 50,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(unknown.is_empty());
}

#[tokio::test]
async fn test_pipeline_over_sqlite() {
    let tmp = TempDir::new().unwrap();
    let (config, store) = seeded_store(&tmp).await;
    let cortex = Cortex::new(Arc::new(store), Arc::new(DisabledProvider), &config);

    let explained = cortex
        .explain(
            "What's the utility bill status for Villa Aruna in January 2025?",
            "org-demo",
        )
        .await
        .unwrap();
    assert_eq!(explained.entities.property_id, Some(1));
    assert!(explained.normalized.contains("$1,250.00"));
    assert!(!explained.normalized.contains("999.00"));

    // Data was found, so the disabled provider produces the apology.
    let result = cortex
        .answer_question("what tasks are pending", "org-demo")
        .await
        .unwrap();
    assert!(result.answer.starts_with("I'm sorry"));
    assert_eq!(result.sources[0].params["status"], "pending");

    let missing = cortex
        .answer_question("Show me finances for Nonexistent Villa", "org-demo")
        .await
        .unwrap();
    assert!(missing.answer.starts_with("I couldn't find"));
}
