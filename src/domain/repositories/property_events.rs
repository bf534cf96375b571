//! Property Events Source Trait
//!
//! This module defines the `PropertyEventsSource` trait, the contract between
//! the pipeline and the upstream events vendor. The pipeline only ever sees
//! records already mapped into the normalized field names, so it can run
//! against the real API client or a fixture-backed stub in tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::entities::listing::ListingEvent;
use crate::domain::entities::sale::SaleRecord;

/// Common result type for vendor API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur talking to the events vendor
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("API returned status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// Parameters for one county fetch against the events API.
#[derive(Debug, Clone)]
pub struct FetchParams {
    pub county_id: i64,
    pub property_types: Vec<String>,
    pub min_price: i64,
    pub min_sqft: f64,
    pub limit: u32,
    pub min_event_date: NaiveDate,
    pub max_event_date: NaiveDate,
}

/// Upstream source of listing and sale events for one county at a time.
#[async_trait]
pub trait PropertyEventsSource: Send + Sync {
    /// Current on-market listings with full event history.
    async fn fetch_listings(&self, params: &FetchParams) -> ApiResult<Vec<ListingEvent>>;

    /// Closed sales within `[min_event_date, max_event_date]`.
    async fn fetch_sales(&self, params: &FetchParams) -> ApiResult<Vec<SaleRecord>>;
}
