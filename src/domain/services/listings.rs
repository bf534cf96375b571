//! Listings Processing
//!
//! Reduces each property's raw event history to a single current-listing
//! snapshot: original and current list prices, most recent sale, and days on
//! market, carrying the property metadata from the latest listing event.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::entities::listing::{CurrentListing, EventKind, ListingEvent};
use crate::domain::services::sales::standardize_property_type;

/// Derive one `CurrentListing` per property from its full event history.
///
/// Only the latest sale cycle of each property is considered. Properties
/// whose latest cycle has no listing event produce no row.
pub fn current_listings(events: Vec<ListingEvent>, today: NaiveDate) -> Vec<CurrentListing> {
    let mut by_property: BTreeMap<i64, Vec<ListingEvent>> = BTreeMap::new();
    for event in events {
        by_property.entry(event.property_id).or_default().push(event);
    }

    let mut result = Vec::new();
    for (property_id, mut history) in by_property {
        let latest_cycle = history
            .iter()
            .map(|e| e.sale_cycle)
            .max()
            .expect("grouped history is never empty");
        history.retain(|e| e.sale_cycle == latest_cycle);

        let listings: Vec<&ListingEvent> = history
            .iter()
            .filter(|e| e.kind == EventKind::Listing)
            .collect();
        let original = match listings.iter().min_by_key(|e| e.event_date) {
            Some(event) => *event,
            None => {
                debug!(
                    property_id,
                    "No listing events in latest sale cycle, skipping"
                );
                continue;
            }
        };
        let current = *listings
            .iter()
            .max_by_key(|e| e.event_date)
            .expect("listings is non-empty here");

        let most_recent_sale = history
            .iter()
            .filter(|e| e.kind == EventKind::Sale)
            .max_by_key(|e| e.event_date);

        result.push(CurrentListing {
            property_id,
            original_list_date: original.event_date,
            original_list_price: original.price,
            current_list_price: current.price,
            list_per_sqft: None,
            days_on_market: (today - original.event_date).num_days(),
            most_recent_sale_date: most_recent_sale.map(|e| e.event_date),
            most_recent_sale_price: most_recent_sale.and_then(|e| e.price),
            listing_to_sale_ratio: None,
            metadata: current.metadata.clone(),
            hex_id: None,
        });
    }

    result
}

/// Clean county names, standardize property types, and derive the price
/// ratios used downstream.
pub fn clean_and_standardize(mut listings: Vec<CurrentListing>) -> Vec<CurrentListing> {
    for listing in &mut listings {
        if let Some(county) = &listing.metadata.county {
            listing.metadata.county = Some(county.replace(" County", ""));
        }
        if let Some(property_type) = &listing.metadata.property_type {
            listing.metadata.property_type = Some(standardize_property_type(property_type));
        }

        listing.list_per_sqft = match (listing.current_list_price, listing.metadata.square_feet) {
            (Some(price), Some(sqft)) if sqft > 0.0 => Some(price as f64 / sqft),
            _ => None,
        };
        listing.listing_to_sale_ratio =
            match (listing.current_list_price, listing.most_recent_sale_price) {
                (Some(list), Some(sale)) if sale > 0 => Some(list as f64 / sale as f64),
                _ => None,
            };
    }
    listings
}
