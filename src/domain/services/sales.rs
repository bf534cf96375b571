//! Sales Processing
//!
//! Cleaning and data-quality filtering of fetched sale records, ahead of
//! aggregation and store reconciliation.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::info;

use crate::domain::entities::sale::SaleRecord;

/// Map the vendor's property type spellings to display types.
pub fn standardize_property_type(raw: &str) -> String {
    match raw {
        "SINGLE_FAMILY" => "SFR".to_string(),
        "TOWNHOUSE" => "Townhouse".to_string(),
        "CONDO" => "Condo".to_string(),
        other => other.to_string(),
    }
}

/// Clean county names and standardize property types in place.
pub fn clean_and_standardize(mut sales: Vec<SaleRecord>) -> Vec<SaleRecord> {
    for sale in &mut sales {
        if let Some(county) = &sale.county {
            sale.county = Some(county.replace(" County", ""));
        }
        if let Some(property_type) = &sale.property_type {
            sale.property_type = Some(standardize_property_type(property_type));
        }
    }
    sales
}

/// Apply data-quality filters: derive price per square foot, drop rows whose
/// price per square foot reaches `max_price_per_sqft`, and drop coarse
/// (county, sale date, sale price) duplicates keeping the first.
///
/// Rows lacking the inputs for a filter are retained rather than dropped.
pub fn apply_quality_filters(sales: Vec<SaleRecord>, max_price_per_sqft: f64) -> Vec<SaleRecord> {
    let before = sales.len();
    let mut seen: HashSet<(String, NaiveDate, i64)> = HashSet::new();
    let mut filtered = Vec::with_capacity(before);

    for mut sale in sales {
        sale.price_per_sqft = match (sale.sale_price, sale.square_feet) {
            (Some(price), Some(sqft)) if sqft > 0.0 => Some(price as f64 / sqft),
            _ => None,
        };
        if let Some(price_sf) = sale.price_per_sqft {
            if price_sf >= max_price_per_sqft {
                continue;
            }
        }

        if let (Some(county), Some(sale_date), Some(sale_price)) =
            (sale.county.clone(), sale.sale_date, sale.sale_price)
        {
            if !seen.insert((county, sale_date, sale_price)) {
                continue;
            }
        }
        filtered.push(sale);
    }

    if filtered.len() < before {
        info!(
            "Quality filters removed {} of {} sales",
            before - filtered.len(),
            before
        );
    }
    filtered
}
