//! Listing History Entities
//!
//! Raw property events as returned by the vendor, and the derived
//! current-listing snapshot used for the point-in-time listings table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of event in a property's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Listing,
    Sale,
}

impl EventKind {
    /// Parse the vendor's event type string. Unknown types are dropped.
    pub fn parse(raw: &str) -> Option<EventKind> {
        match raw {
            "LISTING" => Some(EventKind::Listing),
            "SALE" => Some(EventKind::Sale),
            _ => None,
        }
    }
}

/// Descriptive property fields shared by every event of a property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyMetadata {
    pub address: Option<String>,
    pub county: Option<String>,
    pub property_type: Option<String>,
    pub square_feet: Option<f64>,
    pub year_built: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Current institutional owner, when the vendor identifies one.
    pub institutional_owner: Option<String>,
}

/// One dated event in a property's listing/sale history.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEvent {
    pub property_id: i64,
    pub kind: EventKind,
    pub event_date: NaiveDate,
    pub price: Option<i64>,
    /// Sale-cycle index; the highest value marks the current cycle.
    pub sale_cycle: i64,
    pub metadata: PropertyMetadata,
}

/// A property currently on the market, reduced from its latest sale cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentListing {
    pub property_id: i64,
    pub original_list_date: NaiveDate,
    pub original_list_price: Option<i64>,
    pub current_list_price: Option<i64>,
    pub list_per_sqft: Option<f64>,
    pub days_on_market: i64,
    pub most_recent_sale_date: Option<NaiveDate>,
    pub most_recent_sale_price: Option<i64>,
    pub listing_to_sale_ratio: Option<f64>,
    pub metadata: PropertyMetadata,
    pub hex_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_parsing() {
        assert_eq!(EventKind::parse("LISTING"), Some(EventKind::Listing));
        assert_eq!(EventKind::parse("SALE"), Some(EventKind::Sale));
        assert_eq!(EventKind::parse("RENTAL"), None);
        assert_eq!(EventKind::parse(""), None);
    }
}
