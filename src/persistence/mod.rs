//! Persistence Layer
//!
//! SQLite storage for the pipeline's four tables, with async operations via
//! sqlx.
//!
//! # Retention model
//! - `sales` is long-lived transactional history governed by a rolling FIFO
//!   window and key-based reconciliation; it is never cleared wholesale.
//! - `listings`, `hex_summary`, and `county_summary` are point-in-time
//!   snapshots fully refreshed on every run.
//!
//! Uniqueness of sale rows is an invariant maintained by the reconciliation
//! pipeline, not by any constraint declared here.

pub mod models;
pub mod sales_repository;
pub mod snapshots;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Database connection pool
pub type DbPool = SqlitePool;

/// Database initialization error
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Query error: {0}")]
    QueryError(String),
}

/// Initialize the database connection pool and run migrations.
///
/// # Arguments
/// - `database_url`: Path to SQLite database file (e.g., "sqlite://data/peachtree.db")
pub async fn init_database(database_url: &str) -> Result<DbPool, DatabaseError> {
    info!("Initializing database: {}", database_url);

    // Ensure data directory exists
    if let Some(db_path) = database_url.strip_prefix("sqlite://") {
        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::ConnectionError(sqlx::Error::Configuration(Box::new(e)))
            })?;
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .log_statements(tracing::log::LevelFilter::Debug);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), DatabaseError> {
    info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sales (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            address TEXT,
            hex_id TEXT,
            county TEXT,
            property_type TEXT,
            square_feet REAL,
            year_built INTEGER,
            latitude REAL,
            longitude REAL,
            sale_date DATE,
            sale_price INTEGER,
            price_per_sqft REAL,
            buyer TEXT,
            seller TEXT,
            as_of_date TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::MigrationError(format!("Failed to create sales table: {}", e)))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS listings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            address TEXT,
            hex_id TEXT,
            county TEXT,
            property_type TEXT,
            square_feet REAL,
            year_built INTEGER,
            latitude REAL,
            longitude REAL,
            inst_owner TEXT,
            original_list_date DATE,
            original_list_price INTEGER,
            current_list_price INTEGER,
            list_per_sqft REAL,
            days_on_market INTEGER,
            most_recent_sale_date DATE,
            most_recent_sale_price INTEGER,
            listing_to_sale_ratio REAL,
            as_of_date TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!("Failed to create listings table: {}", e))
    })?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS hex_summary (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            hex_id TEXT NOT NULL,
            as_of_date TEXT NOT NULL,
            total_sales INTEGER NOT NULL DEFAULT 0,
            inst_acquisitions INTEGER NOT NULL DEFAULT 0,
            inst_dispositions INTEGER NOT NULL DEFAULT 0,
            median_vintage REAL,
            median_size REAL,
            median_price_sqft REAL,
            total_listings INTEGER NOT NULL DEFAULT 0,
            inst_listings INTEGER NOT NULL DEFAULT 0,
            median_list_price_sqft REAL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!("Failed to create hex_summary table: {}", e))
    })?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS county_summary (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            county TEXT NOT NULL,
            year_month TEXT NOT NULL,
            as_of_date TEXT NOT NULL,
            total_sales INTEGER NOT NULL DEFAULT 0,
            median_vintage REAL,
            median_size REAL,
            median_price_sqft REAL,
            inst_acquisitions INTEGER NOT NULL DEFAULT 0,
            inst_dispositions INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!("Failed to create county_summary table: {}", e))
    })?;

    // Pruning and range fetches both filter on sale_date.
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sales_sale_date ON sales(sale_date)")
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sales_address ON sales(address)")
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_county_summary_month ON county_summary(county, year_month)")
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    info!("Database migrations completed successfully");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_init() {
        let pool = init_database("sqlite::memory:").await;
        assert!(pool.is_ok());
    }

    #[tokio::test]
    async fn test_migrations_create_all_tables() {
        let pool = init_database("sqlite::memory:").await.unwrap();

        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('sales', 'listings', 'hex_summary', 'county_summary')"
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(result.0, 4);
    }
}
