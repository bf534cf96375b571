//! Sale Transaction Entity

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One closed sale fetched from the events API.
///
/// Key fields for reconciliation are `address`, `sale_date`, and
/// `sale_price`; everything else is descriptive and carried through to the
/// store untouched. All fields the vendor can omit are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub property_id: i64,
    pub address: Option<String>,
    pub county: Option<String>,
    pub sale_date: Option<NaiveDate>,
    pub sale_price: Option<i64>,
    pub buyer: Option<String>,
    pub seller: Option<String>,
    pub property_type: Option<String>,
    pub square_feet: Option<f64>,
    pub year_built: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hex_id: Option<String>,
    pub price_per_sqft: Option<f64>,
}

impl SaleRecord {
    /// Whether an institutional entity appears on either side of the sale.
    pub fn is_investor_transaction(&self) -> bool {
        self.buyer.is_some() || self.seller.is_some()
    }

    /// Calendar month of the sale, formatted `YYYY-MM`.
    pub fn year_month(&self) -> Option<String> {
        self.sale_date.map(|d| d.format("%Y-%m").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_investor_transaction_detection() {
        let mut sale = SaleRecord::default();
        assert!(!sale.is_investor_transaction());

        sale.buyer = Some("OPENDOOR PROPERTY TRUST".to_string());
        assert!(sale.is_investor_transaction());

        sale.buyer = None;
        sale.seller = Some("PROGRESS RESIDENTIAL".to_string());
        assert!(sale.is_investor_transaction());
    }

    #[test]
    fn test_year_month_formatting() {
        let sale = SaleRecord {
            sale_date: NaiveDate::from_ymd_opt(2023, 1, 5),
            ..Default::default()
        };
        assert_eq!(sale.year_month(), Some("2023-01".to_string()));

        let undated = SaleRecord::default();
        assert_eq!(undated.year_month(), None);
    }
}
