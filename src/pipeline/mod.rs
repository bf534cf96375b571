//! ETL Pipeline Orchestration
//!
//! One run fetches listing and sale events for every configured county,
//! cleans and aggregates them, refreshes the snapshot tables, and reconciles
//! sales into the FIFO history table.

pub mod reconciliation;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use crate::config::{EtlConfig, COUNTIES, PROPERTY_TYPES};
use crate::domain::repositories::property_events::{ApiError, FetchParams, PropertyEventsSource};
use crate::domain::services::{aggregate, listings, sales};
use crate::infrastructure::hex_index::HexIndex;
use crate::persistence::sales_repository::SalesRepository;
use crate::persistence::snapshots::SnapshotRepository;
use crate::persistence::{DatabaseError, DbPool};
use reconciliation::{ReconciliationSummary, SalesReconciler};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Counts reported at the end of one pipeline run.
#[derive(Debug)]
pub struct RunReport {
    pub as_of: String,
    pub listings_processed: usize,
    pub sales_processed: usize,
    pub hex_rows: usize,
    pub county_rows: usize,
    pub reconciliation: ReconciliationSummary,
}

/// Single-run ETL orchestrator. Owns the store handle and the upstream
/// source for the duration of the run; one run executes to completion before
/// another may start.
pub struct EtlPipeline<S: PropertyEventsSource> {
    config: EtlConfig,
    source: S,
    hex_index: Box<dyn HexIndex>,
    pool: DbPool,
}

impl<S: PropertyEventsSource> EtlPipeline<S> {
    pub fn new(config: EtlConfig, source: S, hex_index: Box<dyn HexIndex>, pool: DbPool) -> Self {
        Self {
            config,
            source,
            hex_index,
            pool,
        }
    }

    fn fetch_params(&self, county_id: i64, today: NaiveDate) -> FetchParams {
        FetchParams {
            county_id,
            property_types: PROPERTY_TYPES.iter().map(|t| t.to_string()).collect(),
            min_price: self.config.min_price,
            min_sqft: self.config.min_sqft,
            limit: self.config.api_limit,
            min_event_date: self.config.min_event_date(today),
            max_event_date: self.config.max_event_date(today),
        }
    }

    pub async fn run(&self, today: NaiveDate) -> Result<RunReport, PipelineError> {
        let as_of = EtlConfig::as_of_tag(today);
        info!("Starting ETL run tagged {}", as_of);

        // ---- Listings ----
        let mut listing_events = Vec::new();
        for (county_id, county_name) in COUNTIES {
            info!("Fetching listings for {}", county_name);
            let events = self
                .source
                .fetch_listings(&self.fetch_params(county_id, today))
                .await?;
            listing_events.extend(events);
        }

        let mut current =
            listings::clean_and_standardize(listings::current_listings(listing_events, today));
        for listing in &mut current {
            if let (Some(lat), Some(lon)) =
                (listing.metadata.latitude, listing.metadata.longitude)
            {
                listing.hex_id = self.hex_index.locate(lat, lon);
            }
        }
        info!("Processed {} current listings", current.len());
        let listings_hex = aggregate::listings_by_hex(&current);

        // ---- Sales ----
        let mut raw_sales = Vec::new();
        for (county_id, county_name) in COUNTIES {
            info!("Fetching sales for {}", county_name);
            let fetched = self
                .source
                .fetch_sales(&self.fetch_params(county_id, today))
                .await?;
            raw_sales.extend(fetched);
        }

        let mut clean_sales = sales::apply_quality_filters(
            sales::clean_and_standardize(raw_sales),
            self.config.max_price_per_sqft,
        );
        for sale in &mut clean_sales {
            if let (Some(lat), Some(lon)) = (sale.latitude, sale.longitude) {
                sale.hex_id = self.hex_index.locate(lat, lon);
            }
        }
        info!("Processed {} sales transactions", clean_sales.len());

        let investor = aggregate::investor_sales(&clean_sales);
        info!(
            "Identified {} institutional investor transactions",
            investor.len()
        );

        let sales_hex = aggregate::sales_by_hex(
            &clean_sales,
            &investor,
            self.config.hex_window_start(today),
        );
        let county_summary = aggregate::sales_by_county(&clean_sales, &investor);
        let hex_summary = aggregate::combine_hex_summaries(sales_hex, listings_hex);
        info!(
            "Aggregated {} hex rows and {} county-month rows",
            hex_summary.len(),
            county_summary.len()
        );

        // ---- Upload: snapshots are full refresh, sales are FIFO ----
        let snapshots = SnapshotRepository::new(self.pool.clone());
        let batch = self.config.insert_batch_size;
        snapshots
            .replace_hex_summaries(&hex_summary, &as_of, batch)
            .await?;
        snapshots
            .replace_county_summaries(&county_summary, &as_of, batch)
            .await?;
        snapshots.replace_listings(&current, &as_of, batch).await?;
        info!("Snapshot tables refreshed");

        let reconciler =
            SalesReconciler::new(SalesRepository::new(self.pool.clone()), &self.config);
        let sales_processed = clean_sales.len();
        let reconciliation = reconciler.reconcile(today, &as_of, clean_sales).await?;

        Ok(RunReport {
            as_of,
            listings_processed: current.len(),
            sales_processed,
            hex_rows: hex_summary.len(),
            county_rows: county_summary.len(),
            reconciliation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    use crate::domain::entities::listing::{EventKind, ListingEvent, PropertyMetadata};
    use crate::domain::entities::sale::SaleRecord;
    use crate::domain::repositories::property_events::ApiResult;
    use crate::infrastructure::hex_index::NullHexIndex;
    use crate::persistence::init_database;

    struct StubSource {
        listings: Vec<ListingEvent>,
        sales: Vec<SaleRecord>,
    }

    #[async_trait]
    impl PropertyEventsSource for StubSource {
        async fn fetch_listings(&self, params: &FetchParams) -> ApiResult<Vec<ListingEvent>> {
            // All stub data arrives via the first county; the rest are empty.
            if params.county_id == COUNTIES[0].0 {
                Ok(self.listings.clone())
            } else {
                Ok(Vec::new())
            }
        }

        async fn fetch_sales(&self, params: &FetchParams) -> ApiResult<Vec<SaleRecord>> {
            if params.county_id == COUNTIES[0].0 {
                Ok(self.sales.clone())
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stub_listing(property_id: i64, day: u32, price: i64) -> ListingEvent {
        ListingEvent {
            property_id,
            kind: EventKind::Listing,
            event_date: date(2025, 3, day),
            price: Some(price),
            sale_cycle: 1,
            metadata: PropertyMetadata {
                address: Some(format!("{} Peachtree St", property_id)),
                county: Some("Fulton County".to_string()),
                property_type: Some("SINGLE_FAMILY".to_string()),
                square_feet: Some(2_000.0),
                ..Default::default()
            },
        }
    }

    fn stub_sale(address: &str, day: u32, price: i64) -> SaleRecord {
        SaleRecord {
            address: Some(address.to_string()),
            county: Some("Fulton County".to_string()),
            sale_date: Some(date(2025, 2, day)),
            sale_price: Some(price),
            square_feet: Some(1_800.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_full_run_refreshes_snapshots_and_reconciles_sales() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let source = StubSource {
            listings: vec![stub_listing(1, 1, 400_000), stub_listing(2, 5, 350_000)],
            sales: vec![
                stub_sale("10 Oak Ave", 1, 300_000),
                stub_sale("10 Oak Ave", 1, 300_000),
                stub_sale("11 Oak Ave", 2, 250_000),
            ],
        };

        let pipeline = EtlPipeline::new(
            EtlConfig::default(),
            source,
            Box::new(NullHexIndex),
            pool.clone(),
        );
        let report = pipeline.run(date(2025, 6, 15)).await.unwrap();

        assert_eq!(report.as_of, "2025.06.15");
        assert_eq!(report.listings_processed, 2);
        // The duplicate 10 Oak Ave sale dropped in the coarse quality filter
        // (same county, date, and price) before reconciliation.
        assert_eq!(report.sales_processed, 2);
        assert_eq!(report.reconciliation.inserted, 2);
        assert_eq!(report.reconciliation.net_change(), 2);

        let listings_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM listings")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(listings_count.0, 2);

        let sale_counties: Vec<(String,)> =
            sqlx::query_as("SELECT county FROM sales ORDER BY sale_date")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(sale_counties.len(), 2);
        // County suffix is stripped during cleaning.
        assert_eq!(sale_counties[0].0, "Fulton");
    }

    #[tokio::test]
    async fn test_second_run_supersedes_persisted_duplicates() {
        let pool = init_database("sqlite::memory:").await.unwrap();

        let mk_pipeline = |pool: DbPool| {
            EtlPipeline::new(
                EtlConfig::default(),
                StubSource {
                    listings: Vec::new(),
                    sales: vec![stub_sale("10 Oak Ave", 1, 300_000)],
                },
                Box::new(NullHexIndex),
                pool,
            )
        };

        let first = mk_pipeline(pool.clone()).run(date(2025, 6, 15)).await.unwrap();
        assert_eq!(first.reconciliation.inserted, 1);
        assert_eq!(first.reconciliation.net_change(), 1);

        let second = mk_pipeline(pool.clone()).run(date(2025, 6, 16)).await.unwrap();
        assert_eq!(second.reconciliation.existing_duplicates.count(), 1);
        assert_eq!(second.reconciliation.inserted, 1);
        assert_eq!(second.reconciliation.net_change(), 0);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sales")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
        // The surviving row carries the second run's snapshot tag.
        let as_of: (String,) = sqlx::query_as("SELECT as_of_date FROM sales")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(as_of.0, "2025.06.16");
    }
}
