//! Sales Reconciliation End-to-End Tests
//!
//! Exercises the full prune → dedup → resolve → insert cycle against an
//! in-memory SQLite store.

use chrono::NaiveDate;

use peachtree::config::EtlConfig;
use peachtree::domain::entities::sale::SaleRecord;
use peachtree::persistence::init_database;
use peachtree::persistence::sales_repository::SalesRepository;
use peachtree::pipeline::reconciliation::{SalesReconciler, StageOutcome};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sale(address: &str, sale_date: NaiveDate, price: i64) -> SaleRecord {
    SaleRecord {
        address: Some(address.to_string()),
        county: Some("Fulton".to_string()),
        sale_date: Some(sale_date),
        sale_price: Some(price),
        ..Default::default()
    }
}

async fn setup() -> (sqlx::SqlitePool, SalesReconciler) {
    let pool = init_database("sqlite::memory:").await.unwrap();
    let config = EtlConfig::default();
    let reconciler = SalesReconciler::new(SalesRepository::new(pool.clone()), &config);
    (pool, reconciler)
}

async fn persisted_addresses(pool: &sqlx::SqlitePool) -> Vec<String> {
    sqlx::query_as::<_, (String,)>("SELECT address FROM sales ORDER BY address")
        .fetch_all(pool)
        .await
        .unwrap()
        .into_iter()
        .map(|(address,)| address)
        .collect()
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let (pool, reconciler) = setup().await;
    let today = date(2023, 6, 15);

    // Seed the store with one persisted A.
    let repo = SalesRepository::new(pool.clone());
    repo.insert_batch(&[sale("123 Main St", date(2023, 1, 1), 300_000)], "2023.06.01", 500)
        .await
        .unwrap();

    // Incoming batch: A twice, then B.
    let incoming = vec![
        sale("123 Main St", date(2023, 1, 1), 300_000),
        sale("123 Main St", date(2023, 1, 1), 300_000),
        sale("456 Elm St", date(2023, 1, 2), 250_000),
    ];

    let summary = reconciler
        .reconcile(today, "2023.06.15", incoming)
        .await
        .unwrap();

    assert_eq!(summary.intra_batch_duplicates, 1);
    assert_eq!(summary.existing_duplicates, StageOutcome::Completed(1));
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.net_change(), 1);

    // Final store holds exactly A and B, tagged with this run's snapshot.
    assert_eq!(
        persisted_addresses(&pool).await,
        vec!["123 Main St".to_string(), "456 Elm St".to_string()]
    );
    let rows = repo.get_recent(10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.as_of_date == "2023.06.15"));
}

#[tokio::test]
async fn test_retention_prunes_strictly_before_month_start_cutoff() {
    let (pool, reconciler) = setup().await;
    // today = 2025-06-15, window = 36 months → cutoff = 2022-06-01.
    let today = date(2025, 6, 15);

    let repo = SalesRepository::new(pool.clone());
    repo.insert_batch(
        &[
            sale("1 Old Rd", date(2022, 5, 31), 100_000),
            sale("2 Edge Rd", date(2022, 6, 1), 150_000),
        ],
        "2025.05.01",
        500,
    )
    .await
    .unwrap();

    let summary = reconciler
        .reconcile(today, "2025.06.15", Vec::new())
        .await
        .unwrap();

    assert_eq!(summary.pruned, StageOutcome::Completed(1));
    assert_eq!(summary.net_change(), -1);
    assert_eq!(persisted_addresses(&pool).await, vec!["2 Edge Rd".to_string()]);
}

#[tokio::test]
async fn test_resolution_is_bounded_by_incoming_date_range() {
    let (pool, reconciler) = setup().await;
    let today = date(2023, 6, 15);

    // Persisted record dated outside the incoming batch's span. Its address
    // and price coincide with an incoming record, but it is never fetched as
    // a candidate and never deleted.
    let repo = SalesRepository::new(pool.clone());
    repo.insert_batch(
        &[sale("123 Main St", date(2022, 12, 31), 300_000)],
        "2023.01.01",
        500,
    )
    .await
    .unwrap();

    let incoming = vec![
        sale("123 Main St", date(2023, 1, 1), 300_000),
        sale("456 Elm St", date(2023, 1, 5), 250_000),
    ];
    let summary = reconciler
        .reconcile(today, "2023.06.15", incoming)
        .await
        .unwrap();

    assert_eq!(summary.existing_duplicates, StageOutcome::Completed(0));
    assert_eq!(summary.inserted, 2);

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sales")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 3);
}

#[tokio::test]
async fn test_incomplete_key_records_pass_through_untouched() {
    let (pool, reconciler) = setup().await;
    let today = date(2023, 6, 15);

    let complete = sale("123 Main St", date(2023, 1, 1), 300_000);
    let mut missing_price = complete.clone();
    missing_price.sale_price = None;

    // Two otherwise-identical records, one missing its price: both insert.
    let summary = reconciler
        .reconcile(today, "2023.06.15", vec![complete, missing_price])
        .await
        .unwrap();

    assert_eq!(summary.intra_batch_duplicates, 0);
    assert_eq!(summary.inserted, 2);

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sales")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 2);
}

#[tokio::test]
async fn test_repeated_runs_do_not_accumulate_duplicates() {
    let (pool, reconciler) = setup().await;
    let today = date(2023, 6, 15);

    let batch = vec![
        sale("123 Main St", date(2023, 1, 1), 300_000),
        sale("456 Elm St", date(2023, 1, 2), 250_000),
    ];

    let first = reconciler
        .reconcile(today, "2023.06.15", batch.clone())
        .await
        .unwrap();
    assert_eq!(first.inserted, 2);
    assert_eq!(first.net_change(), 2);

    let second = reconciler
        .reconcile(today, "2023.06.16", batch)
        .await
        .unwrap();
    assert_eq!(second.existing_duplicates, StageOutcome::Completed(2));
    assert_eq!(second.inserted, 2);
    assert_eq!(second.net_change(), 0);

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sales")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 2);
}

#[tokio::test]
async fn test_key_matching_ignores_address_case_and_whitespace() {
    let (pool, reconciler) = setup().await;
    let today = date(2023, 6, 15);

    let repo = SalesRepository::new(pool.clone());
    repo.insert_batch(
        &[sale("123 Main St ", date(2023, 1, 1), 300_000)],
        "2023.06.01",
        500,
    )
    .await
    .unwrap();

    let summary = reconciler
        .reconcile(
            today,
            "2023.06.15",
            vec![sale("123 MAIN ST", date(2023, 1, 1), 300_000)],
        )
        .await
        .unwrap();

    assert_eq!(summary.existing_duplicates, StageOutcome::Completed(1));
    assert_eq!(summary.inserted, 1);

    // The incoming spelling is now the authoritative row.
    assert_eq!(
        persisted_addresses(&pool).await,
        vec!["123 MAIN ST".to_string()]
    );
}

#[tokio::test]
async fn test_large_batch_respects_delete_batching() {
    let (pool, reconciler) = setup().await;
    let today = date(2023, 6, 15);

    // More colliding rows than one delete batch (default size 50).
    let batch: Vec<SaleRecord> = (0..120)
        .map(|i| sale(&format!("{} Oak Ave", i), date(2023, 1, 1 + (i % 28) as u32), 200_000 + i))
        .collect();

    let repo = SalesRepository::new(pool.clone());
    repo.insert_batch(&batch, "2023.06.01", 500).await.unwrap();

    let summary = reconciler
        .reconcile(today, "2023.06.15", batch)
        .await
        .unwrap();

    assert_eq!(summary.existing_duplicates, StageOutcome::Completed(120));
    assert_eq!(summary.inserted, 120);

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sales")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 120);
}
