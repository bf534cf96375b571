//! Database Models
//!
//! Persistent row shapes for the sales table and the key projection used by
//! duplicate resolution.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Sale row as persisted
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SaleRow {
    pub id: i64,
    pub address: Option<String>,
    pub hex_id: Option<String>,
    pub county: Option<String>,
    pub property_type: Option<String>,
    pub square_feet: Option<f64>,
    pub year_built: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub sale_date: Option<NaiveDate>,
    pub sale_price: Option<i64>,
    pub price_per_sqft: Option<f64>,
    pub buyer: Option<String>,
    pub seller: Option<String>,
    pub as_of_date: String,
}

/// Key-field projection fetched during duplicate resolution. Limited to the
/// matching-key columns so range fetches stay cheap.
#[derive(Debug, Clone, FromRow)]
pub struct SaleKeyRow {
    pub address: Option<String>,
    pub sale_date: Option<NaiveDate>,
    pub sale_price: Option<i64>,
}

/// Fully-populated key triple identifying persisted rows to delete. Values
/// are the raw stored fields, not the normalized key.
#[derive(Debug, Clone)]
pub struct PersistedSaleKey {
    pub address: String,
    pub sale_date: NaiveDate,
    pub sale_price: i64,
}
