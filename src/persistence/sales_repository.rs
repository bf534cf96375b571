//! Sales Repository
//!
//! Data access for the long-lived sales table: retention pruning, the
//! key-projection range fetch used by duplicate resolution, batched deletes,
//! and batched inserts.

use chrono::NaiveDate;
use sqlx::QueryBuilder;
use tracing::{debug, error};

use super::models::{PersistedSaleKey, SaleKeyRow, SaleRow};
use super::{DatabaseError, DbPool};
use crate::domain::entities::sale::SaleRecord;

pub struct SalesRepository {
    pool: DbPool,
}

impl SalesRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Delete every sale strictly older than `cutoff`. Returns rows removed.
    pub async fn delete_older_than(&self, cutoff: NaiveDate) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM sales WHERE sale_date < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to prune sales older than {}: {}", cutoff, e);
                DatabaseError::QueryError(format!("Failed to prune sales: {}", e))
            })?;

        let removed = result.rows_affected();
        debug!("Pruned {} sales older than {}", removed, cutoff);
        Ok(removed)
    }

    /// Fetch the matching-key fields of every sale dated within
    /// `[start, end]`. The projection is limited to the key columns.
    pub async fn fetch_key_fields_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SaleKeyRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, SaleKeyRow>(
            r#"
            SELECT address, sale_date, sale_price FROM sales
            WHERE sale_date >= ?1 AND sale_date <= ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to fetch sales in range {}..{}: {}", start, end, e);
            DatabaseError::QueryError(format!("Failed to fetch sales in range: {}", e))
        })?;

        debug!(
            "Fetched {} candidate sales between {} and {}",
            rows.len(),
            start,
            end
        );
        Ok(rows)
    }

    /// Delete the rows matching the given key triples, as a single statement.
    /// Callers chunk the triples to bound statement size.
    pub async fn delete_matching(&self, keys: &[PersistedSaleKey]) -> Result<u64, DatabaseError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::<sqlx::Sqlite>::new("DELETE FROM sales WHERE ");
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                query.push(" OR ");
            }
            query
                .push("(address = ")
                .push_bind(&key.address)
                .push(" AND sale_date = ")
                .push_bind(key.sale_date)
                .push(" AND sale_price = ")
                .push_bind(key.sale_price)
                .push(")");
        }

        let result = query.build().execute(&self.pool).await.map_err(|e| {
            error!("Failed to delete {} duplicate sales: {}", keys.len(), e);
            DatabaseError::QueryError(format!("Failed to delete duplicate sales: {}", e))
        })?;

        Ok(result.rows_affected())
    }

    /// Insert sales in `batch_size` chunks, tagging each row with `as_of`.
    pub async fn insert_batch(
        &self,
        sales: &[SaleRecord],
        as_of: &str,
        batch_size: usize,
    ) -> Result<u64, DatabaseError> {
        if sales.is_empty() {
            debug!("No sales to insert");
            return Ok(0);
        }

        let mut inserted = 0u64;
        for chunk in sales.chunks(batch_size.max(1)) {
            let mut query = QueryBuilder::<sqlx::Sqlite>::new(
                "INSERT INTO sales (address, hex_id, county, property_type, square_feet, \
                 year_built, latitude, longitude, sale_date, sale_price, price_per_sqft, \
                 buyer, seller, as_of_date) ",
            );
            query.push_values(chunk, |mut row, sale| {
                row.push_bind(sale.address.as_deref())
                    .push_bind(sale.hex_id.as_deref())
                    .push_bind(sale.county.as_deref())
                    .push_bind(sale.property_type.as_deref())
                    .push_bind(sale.square_feet)
                    .push_bind(sale.year_built)
                    .push_bind(sale.latitude)
                    .push_bind(sale.longitude)
                    .push_bind(sale.sale_date)
                    .push_bind(sale.sale_price)
                    .push_bind(sale.price_per_sqft)
                    .push_bind(sale.buyer.as_deref())
                    .push_bind(sale.seller.as_deref())
                    .push_bind(as_of);
            });

            let result = query.build().execute(&self.pool).await.map_err(|e| {
                error!("Failed to insert sales batch: {}", e);
                DatabaseError::QueryError(format!("Failed to insert sales batch: {}", e))
            })?;
            inserted += result.rows_affected();
        }

        debug!("Inserted {} sales", inserted);
        Ok(inserted)
    }

    /// Most recently dated sales (last N).
    pub async fn get_recent(&self, limit: i64) -> Result<Vec<SaleRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, SaleRow>(
            "SELECT * FROM sales ORDER BY sale_date DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get recent sales: {}", e);
            DatabaseError::QueryError(format!("Failed to get recent sales: {}", e))
        })?;

        Ok(rows)
    }

    /// Total persisted sales.
    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to count sales: {}", e);
                DatabaseError::QueryError(format!("Failed to count sales: {}", e))
            })?;
        Ok(row.0)
    }
}
