//! Sale Matching Key
//!
//! Sales carry no stable upstream identifier, so reconciliation identifies a
//! transaction by the (address, sale date, sale price) triple. Two records
//! with equal keys are treated as the same transaction.

use chrono::NaiveDate;

use crate::domain::entities::sale::SaleRecord;

/// Surrogate identity for a sale. The address is stored normalized; date and
/// price pass through unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchingKey {
    pub address: String,
    pub sale_date: NaiveDate,
    pub sale_price: i64,
}

impl MatchingKey {
    /// Build a key from raw field values. Returns `None` when the address is
    /// empty after trimming or the price is absent-by-convention (zero).
    pub fn new(address: &str, sale_date: NaiveDate, sale_price: i64) -> Option<MatchingKey> {
        let address = normalize_address(address)?;
        if sale_price <= 0 {
            return None;
        }
        Some(MatchingKey {
            address,
            sale_date,
            sale_price,
        })
    }

    /// Derive the key for a sale record, or `None` if any key field is
    /// missing. Records without a key never participate in deduplication.
    pub fn for_sale(sale: &SaleRecord) -> Option<MatchingKey> {
        let address = sale.address.as_deref()?;
        let sale_date = sale.sale_date?;
        let sale_price = sale.sale_price?;
        MatchingKey::new(address, sale_date, sale_price)
    }
}

/// Trim surrounding whitespace and uppercase. No locale-aware parsing and no
/// fuzzy matching; equality is exact after this.
fn normalize_address(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_uppercase())
}
