//! Parcl Labs API Client
//!
//! Client for the vendor's property-search endpoint. Responses arrive as
//! property items with nested metadata and event history; everything is
//! mapped into the normalized domain records before leaving this module.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::entities::listing::{EventKind, ListingEvent, PropertyMetadata};
use crate::domain::entities::sale::SaleRecord;
use crate::domain::repositories::property_events::{
    ApiError, ApiResult, FetchParams, PropertyEventsSource,
};

const SEARCH_PATH: &str = "/v2/property/search";
const USER_AGENT: &str = "peachtree-etl/0.1.0";

/// Parcl Labs client for API interactions
pub struct ParclClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ParclClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn search(&self, request: &SearchRequest) -> ApiResult<SearchResponse> {
        let url = format!("{}{}", self.base_url, SEARCH_PATH);

        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.api_key)
            .header("User-Agent", USER_AGENT)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::HttpStatus { status, body });
        }

        response
            .json::<SearchResponse>()
            .await
            .map_err(|e| ApiError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl PropertyEventsSource for ParclClient {
    async fn fetch_listings(&self, params: &FetchParams) -> ApiResult<Vec<ListingEvent>> {
        let request = SearchRequest {
            parcl_ids: vec![params.county_id],
            event_names: vec!["ALL_LISTINGS".to_string()],
            property_types: params.property_types.clone(),
            limit: params.limit,
            current_on_market_flag: true,
            include_property_details: true,
            include_full_event_history: Some(true),
            min_event_date: None,
            max_event_date: None,
            min_price: params.min_price,
            min_sqft: params.min_sqft,
        };

        let response = self.search(&request).await?;
        let events = map_listing_events(response.items);
        debug!(
            county_id = params.county_id,
            event_count = events.len(),
            "Fetched listing events"
        );
        Ok(events)
    }

    async fn fetch_sales(&self, params: &FetchParams) -> ApiResult<Vec<SaleRecord>> {
        let request = SearchRequest {
            parcl_ids: vec![params.county_id],
            event_names: vec!["SOLD".to_string()],
            property_types: params.property_types.clone(),
            limit: params.limit,
            current_on_market_flag: false,
            include_property_details: true,
            include_full_event_history: None,
            min_event_date: Some(params.min_event_date),
            max_event_date: Some(params.max_event_date),
            min_price: params.min_price,
            min_sqft: params.min_sqft,
        };

        let response = self.search(&request).await?;
        let sales = map_sales(response.items);
        debug!(
            county_id = params.county_id,
            sale_count = sales.len(),
            "Fetched sales"
        );
        Ok(sales)
    }
}

/// Property search request body
#[derive(Debug, Clone, Serialize)]
struct SearchRequest {
    parcl_ids: Vec<i64>,
    event_names: Vec<String>,
    property_types: Vec<String>,
    limit: u32,
    current_on_market_flag: bool,
    include_property_details: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_full_event_history: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_event_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_event_date: Option<NaiveDate>,
    min_price: i64,
    min_sqft: f64,
}

/// Property search response body
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<PropertyItem>,
}

#[derive(Debug, Deserialize)]
struct PropertyItem {
    parcl_property_id: i64,
    #[serde(default)]
    property_metadata: PropertyMetadataDto,
    #[serde(default)]
    events: Vec<EventDto>,
}

#[derive(Debug, Default, Deserialize)]
struct PropertyMetadataDto {
    address1: Option<String>,
    county_name: Option<String>,
    property_type: Option<String>,
    sq_ft: Option<f64>,
    year_built: Option<i32>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    current_entity_owner_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventDto {
    event_type: Option<String>,
    event_date: Option<NaiveDate>,
    price: Option<i64>,
    #[serde(default)]
    true_sale_index: Option<i64>,
    entity_owner_name: Option<String>,
    entity_seller_name: Option<String>,
}

fn metadata_from(dto: &PropertyMetadataDto) -> PropertyMetadata {
    PropertyMetadata {
        address: dto.address1.clone(),
        county: dto.county_name.clone(),
        property_type: dto.property_type.clone(),
        square_feet: dto.sq_ft,
        year_built: dto.year_built,
        latitude: dto.latitude,
        longitude: dto.longitude,
        institutional_owner: dto.current_entity_owner_name.clone(),
    }
}

/// Flatten items into dated listing-history events. Events without a parsable
/// type or a date are dropped.
fn map_listing_events(items: Vec<PropertyItem>) -> Vec<ListingEvent> {
    let mut result = Vec::new();
    for item in items {
        let metadata = metadata_from(&item.property_metadata);
        for event in item.events {
            let kind = match event.event_type.as_deref().and_then(EventKind::parse) {
                Some(kind) => kind,
                None => continue,
            };
            let event_date = match event.event_date {
                Some(event_date) => event_date,
                None => continue,
            };
            result.push(ListingEvent {
                property_id: item.parcl_property_id,
                kind,
                event_date,
                price: event.price,
                sale_cycle: event.true_sale_index.unwrap_or(0),
                metadata: metadata.clone(),
            });
        }
    }
    result
}

/// Flatten items into sale records, one per SALE event.
fn map_sales(items: Vec<PropertyItem>) -> Vec<SaleRecord> {
    let mut result = Vec::new();
    for item in items {
        let metadata = metadata_from(&item.property_metadata);
        for event in item.events {
            if event.event_type.as_deref().and_then(EventKind::parse) != Some(EventKind::Sale) {
                continue;
            }
            result.push(SaleRecord {
                property_id: item.parcl_property_id,
                address: metadata.address.clone(),
                county: metadata.county.clone(),
                sale_date: event.event_date,
                sale_price: event.price,
                buyer: event.entity_owner_name,
                seller: event.entity_seller_name,
                property_type: metadata.property_type.clone(),
                square_feet: metadata.square_feet,
                year_built: metadata.year_built,
                latitude: metadata.latitude,
                longitude: metadata.longitude,
                hex_id: None,
                price_per_sqft: None,
            });
        }
    }
    result
}
