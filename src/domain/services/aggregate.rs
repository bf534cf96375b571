//! Spatial and Temporal Aggregation
//!
//! Rolls cleaned sales and listings up into hex-level and county-month
//! summaries. Hex aggregation of sales is limited to a recent window; county
//! aggregation spans the full fetched history.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::entities::listing::CurrentListing;
use crate::domain::entities::sale::SaleRecord;
use crate::domain::entities::summary::{CountySummary, HexSummary};

/// Sales-side aggregates for one hex cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HexSalesAggregate {
    pub hex_id: String,
    pub total_sales: u64,
    pub median_vintage: Option<f64>,
    pub median_size: Option<f64>,
    pub median_price_sqft: Option<f64>,
    pub inst_acquisitions: u64,
    pub inst_dispositions: u64,
}

/// Listings-side aggregates for one hex cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HexListingsAggregate {
    pub hex_id: String,
    pub total_listings: u64,
    pub inst_listings: u64,
    pub median_list_price_sqft: Option<f64>,
}

/// Midpoint median; mean of the two middle values for even counts.
fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).expect("aggregated values are finite"));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Subset of sales with an institutional entity on either side.
pub fn investor_sales(sales: &[SaleRecord]) -> Vec<SaleRecord> {
    sales
        .iter()
        .filter(|s| s.is_investor_transaction())
        .cloned()
        .collect()
}

/// Aggregate sales per hex cell, limited to sales after `window_start`.
/// Sales without a hex id or sale date fall out of the aggregation.
pub fn sales_by_hex(
    sales: &[SaleRecord],
    investor: &[SaleRecord],
    window_start: NaiveDate,
) -> Vec<HexSalesAggregate> {
    let mut grouped: BTreeMap<String, Vec<&SaleRecord>> = BTreeMap::new();
    for sale in sales {
        if let (Some(hex_id), Some(sale_date)) = (&sale.hex_id, sale.sale_date) {
            if sale_date > window_start {
                grouped.entry(hex_id.clone()).or_default().push(sale);
            }
        }
    }

    let mut investor_grouped: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for sale in investor {
        if let (Some(hex_id), Some(sale_date)) = (&sale.hex_id, sale.sale_date) {
            if sale_date > window_start {
                let counts = investor_grouped.entry(hex_id.clone()).or_default();
                if sale.buyer.is_some() {
                    counts.0 += 1;
                }
                if sale.seller.is_some() {
                    counts.1 += 1;
                }
            }
        }
    }

    grouped
        .into_iter()
        .map(|(hex_id, sales)| {
            let (inst_acquisitions, inst_dispositions) =
                investor_grouped.get(&hex_id).copied().unwrap_or((0, 0));
            HexSalesAggregate {
                total_sales: sales.len() as u64,
                median_vintage: median(
                    sales.iter().filter_map(|s| s.year_built.map(f64::from)).collect(),
                ),
                median_size: median(sales.iter().filter_map(|s| s.square_feet).collect()),
                median_price_sqft: median(sales.iter().filter_map(|s| s.price_per_sqft).collect()),
                inst_acquisitions,
                inst_dispositions,
                hex_id,
            }
        })
        .collect()
}

/// Aggregate current listings per hex cell.
pub fn listings_by_hex(listings: &[CurrentListing]) -> Vec<HexListingsAggregate> {
    let mut grouped: BTreeMap<String, Vec<&CurrentListing>> = BTreeMap::new();
    for listing in listings {
        if let Some(hex_id) = &listing.hex_id {
            grouped.entry(hex_id.clone()).or_default().push(listing);
        }
    }

    grouped
        .into_iter()
        .map(|(hex_id, listings)| HexListingsAggregate {
            total_listings: listings.len() as u64,
            inst_listings: listings
                .iter()
                .filter(|l| l.metadata.institutional_owner.is_some())
                .count() as u64,
            median_list_price_sqft: median(
                listings.iter().filter_map(|l| l.list_per_sqft).collect(),
            ),
            hex_id,
        })
        .collect()
}

/// Outer-merge the sales and listings sides into the final hex summary.
/// A hex present on only one side keeps zero counts on the other.
pub fn combine_hex_summaries(
    sales: Vec<HexSalesAggregate>,
    listings: Vec<HexListingsAggregate>,
) -> Vec<HexSummary> {
    let mut merged: BTreeMap<String, HexSummary> = BTreeMap::new();

    for agg in sales {
        let entry = merged.entry(agg.hex_id.clone()).or_insert_with(|| HexSummary {
            hex_id: agg.hex_id.clone(),
            ..Default::default()
        });
        entry.total_sales = agg.total_sales;
        entry.median_vintage = agg.median_vintage;
        entry.median_size = agg.median_size;
        entry.median_price_sqft = agg.median_price_sqft;
        entry.inst_acquisitions = agg.inst_acquisitions;
        entry.inst_dispositions = agg.inst_dispositions;
    }

    for agg in listings {
        let entry = merged.entry(agg.hex_id.clone()).or_insert_with(|| HexSummary {
            hex_id: agg.hex_id.clone(),
            ..Default::default()
        });
        entry.total_listings = agg.total_listings;
        entry.inst_listings = agg.inst_listings;
        entry.median_list_price_sqft = agg.median_list_price_sqft;
    }

    merged.into_values().collect()
}

/// Aggregate sales per (county, calendar month) over the full fetched
/// history. Sales without a county or sale date fall out.
pub fn sales_by_county(sales: &[SaleRecord], investor: &[SaleRecord]) -> Vec<CountySummary> {
    let mut grouped: BTreeMap<(String, String), Vec<&SaleRecord>> = BTreeMap::new();
    for sale in sales {
        if let (Some(county), Some(year_month)) = (&sale.county, sale.year_month()) {
            grouped.entry((county.clone(), year_month)).or_default().push(sale);
        }
    }

    let mut investor_grouped: BTreeMap<(String, String), (u64, u64)> = BTreeMap::new();
    for sale in investor {
        if let (Some(county), Some(year_month)) = (&sale.county, sale.year_month()) {
            let counts = investor_grouped
                .entry((county.clone(), year_month))
                .or_default();
            if sale.buyer.is_some() {
                counts.0 += 1;
            }
            if sale.seller.is_some() {
                counts.1 += 1;
            }
        }
    }

    grouped
        .into_iter()
        .map(|((county, year_month), sales)| {
            let (inst_acquisitions, inst_dispositions) = investor_grouped
                .get(&(county.clone(), year_month.clone()))
                .copied()
                .unwrap_or((0, 0));
            CountySummary {
                total_sales: sales.len() as u64,
                median_vintage: median(
                    sales.iter().filter_map(|s| s.year_built.map(f64::from)).collect(),
                ),
                median_size: median(sales.iter().filter_map(|s| s.square_feet).collect()),
                median_price_sqft: median(sales.iter().filter_map(|s| s.price_per_sqft).collect()),
                inst_acquisitions,
                inst_dispositions,
                county,
                year_month,
            }
        })
        .collect()
}
