//! Snapshot Repository
//!
//! Full-refresh persistence for the point-in-time tables: current listings,
//! hex summaries, and county summaries. Each run clears the table and
//! re-inserts the new snapshot in batches.

use sqlx::QueryBuilder;
use tracing::{debug, error};

use super::{DatabaseError, DbPool};
use crate::domain::entities::listing::CurrentListing;
use crate::domain::entities::summary::{CountySummary, HexSummary};

pub struct SnapshotRepository {
    pool: DbPool,
}

impl SnapshotRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn clear_table(&self, table: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to clear table {}: {}", table, e);
                DatabaseError::QueryError(format!("Failed to clear table {}: {}", table, e))
            })?;
        debug!("Cleared {} rows from {}", result.rows_affected(), table);
        Ok(result.rows_affected())
    }

    /// Replace the listings snapshot with the given rows.
    pub async fn replace_listings(
        &self,
        listings: &[CurrentListing],
        as_of: &str,
        batch_size: usize,
    ) -> Result<u64, DatabaseError> {
        self.clear_table("listings").await?;

        let mut inserted = 0u64;
        for chunk in listings.chunks(batch_size.max(1)) {
            let mut query = QueryBuilder::<sqlx::Sqlite>::new(
                "INSERT INTO listings (address, hex_id, county, property_type, square_feet, \
                 year_built, latitude, longitude, inst_owner, original_list_date, \
                 original_list_price, current_list_price, list_per_sqft, days_on_market, \
                 most_recent_sale_date, most_recent_sale_price, listing_to_sale_ratio, \
                 as_of_date) ",
            );
            query.push_values(chunk, |mut row, listing| {
                row.push_bind(listing.metadata.address.as_deref())
                    .push_bind(listing.hex_id.as_deref())
                    .push_bind(listing.metadata.county.as_deref())
                    .push_bind(listing.metadata.property_type.as_deref())
                    .push_bind(listing.metadata.square_feet)
                    .push_bind(listing.metadata.year_built)
                    .push_bind(listing.metadata.latitude)
                    .push_bind(listing.metadata.longitude)
                    .push_bind(listing.metadata.institutional_owner.as_deref())
                    .push_bind(listing.original_list_date)
                    .push_bind(listing.original_list_price)
                    .push_bind(listing.current_list_price)
                    .push_bind(listing.list_per_sqft)
                    .push_bind(listing.days_on_market)
                    .push_bind(listing.most_recent_sale_date)
                    .push_bind(listing.most_recent_sale_price)
                    .push_bind(listing.listing_to_sale_ratio)
                    .push_bind(as_of);
            });

            let result = query.build().execute(&self.pool).await.map_err(|e| {
                error!("Failed to insert listings batch: {}", e);
                DatabaseError::QueryError(format!("Failed to insert listings batch: {}", e))
            })?;
            inserted += result.rows_affected();
        }

        debug!("Inserted {} listings", inserted);
        Ok(inserted)
    }

    /// Replace the hex summary snapshot.
    pub async fn replace_hex_summaries(
        &self,
        summaries: &[HexSummary],
        as_of: &str,
        batch_size: usize,
    ) -> Result<u64, DatabaseError> {
        self.clear_table("hex_summary").await?;

        let mut inserted = 0u64;
        for chunk in summaries.chunks(batch_size.max(1)) {
            let mut query = QueryBuilder::<sqlx::Sqlite>::new(
                "INSERT INTO hex_summary (hex_id, as_of_date, total_sales, inst_acquisitions, \
                 inst_dispositions, median_vintage, median_size, median_price_sqft, \
                 total_listings, inst_listings, median_list_price_sqft) ",
            );
            query.push_values(chunk, |mut row, summary| {
                row.push_bind(summary.hex_id.as_str())
                    .push_bind(as_of)
                    .push_bind(summary.total_sales as i64)
                    .push_bind(summary.inst_acquisitions as i64)
                    .push_bind(summary.inst_dispositions as i64)
                    .push_bind(summary.median_vintage)
                    .push_bind(summary.median_size)
                    .push_bind(summary.median_price_sqft)
                    .push_bind(summary.total_listings as i64)
                    .push_bind(summary.inst_listings as i64)
                    .push_bind(summary.median_list_price_sqft);
            });

            let result = query.build().execute(&self.pool).await.map_err(|e| {
                error!("Failed to insert hex summary batch: {}", e);
                DatabaseError::QueryError(format!("Failed to insert hex summary batch: {}", e))
            })?;
            inserted += result.rows_affected();
        }

        debug!("Inserted {} hex summaries", inserted);
        Ok(inserted)
    }

    /// Replace the county summary snapshot.
    pub async fn replace_county_summaries(
        &self,
        summaries: &[CountySummary],
        as_of: &str,
        batch_size: usize,
    ) -> Result<u64, DatabaseError> {
        self.clear_table("county_summary").await?;

        let mut inserted = 0u64;
        for chunk in summaries.chunks(batch_size.max(1)) {
            let mut query = QueryBuilder::<sqlx::Sqlite>::new(
                "INSERT INTO county_summary (county, year_month, as_of_date, total_sales, \
                 median_vintage, median_size, median_price_sqft, inst_acquisitions, \
                 inst_dispositions) ",
            );
            query.push_values(chunk, |mut row, summary| {
                row.push_bind(summary.county.as_str())
                    .push_bind(summary.year_month.as_str())
                    .push_bind(as_of)
                    .push_bind(summary.total_sales as i64)
                    .push_bind(summary.median_vintage)
                    .push_bind(summary.median_size)
                    .push_bind(summary.median_price_sqft)
                    .push_bind(summary.inst_acquisitions as i64)
                    .push_bind(summary.inst_dispositions as i64);
            });

            let result = query.build().execute(&self.pool).await.map_err(|e| {
                error!("Failed to insert county summary batch: {}", e);
                DatabaseError::QueryError(format!("Failed to insert county summary batch: {}", e))
            })?;
            inserted += result.rows_affected();
        }

        debug!("Inserted {} county summaries", inserted);
        Ok(inserted)
    }
}
