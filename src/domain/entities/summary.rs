//! Aggregated Summary Entities

use serde::{Deserialize, Serialize};

/// Combined sales + listings aggregates for one hex cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HexSummary {
    pub hex_id: String,
    pub total_sales: u64,
    pub inst_acquisitions: u64,
    pub inst_dispositions: u64,
    pub median_vintage: Option<f64>,
    pub median_size: Option<f64>,
    pub median_price_sqft: Option<f64>,
    pub total_listings: u64,
    pub inst_listings: u64,
    pub median_list_price_sqft: Option<f64>,
}

/// Sales aggregates for one county and calendar month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountySummary {
    pub county: String,
    pub year_month: String,
    pub total_sales: u64,
    pub median_vintage: Option<f64>,
    pub median_size: Option<f64>,
    pub median_price_sqft: Option<f64>,
    pub inst_acquisitions: u64,
    pub inst_dispositions: u64,
}
