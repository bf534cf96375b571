//! Intra-Batch Deduplication
//!
//! Removes duplicate sales within one fetched batch before any store
//! interaction. First occurrence wins; later records with the same matching
//! key are discarded. Records without a complete key are always kept.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::domain::entities::sale::SaleRecord;
use crate::domain::services::matching_key::MatchingKey;

/// Result of deduplicating one incoming batch.
#[derive(Debug)]
pub struct BatchDedupOutcome {
    pub unique: Vec<SaleRecord>,
    pub duplicates_removed: u64,
}

/// Single ordered pass over the batch. O(n) time, O(n) space for the
/// seen-key set. Malformed records never halt the batch.
pub fn dedupe_sales(batch: Vec<SaleRecord>) -> BatchDedupOutcome {
    let total = batch.len();
    let mut seen: HashSet<MatchingKey> = HashSet::new();
    let mut unique = Vec::with_capacity(total);
    let mut duplicates_removed = 0u64;

    for sale in batch {
        match MatchingKey::for_sale(&sale) {
            Some(key) => {
                if seen.insert(key) {
                    unique.push(sale);
                } else {
                    duplicates_removed += 1;
                }
            }
            // Incomplete key: keep unconditionally.
            None => unique.push(sale),
        }
    }

    if duplicates_removed > 0 {
        info!(
            "Removed {} internal duplicates from {} fetched sales",
            duplicates_removed, total
        );
    } else {
        debug!("No internal duplicates in {} fetched sales", total);
    }

    BatchDedupOutcome {
        unique,
        duplicates_removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sale(address: &str, day: u32, price: i64, county: &str) -> SaleRecord {
        SaleRecord {
            address: Some(address.to_string()),
            county: Some(county.to_string()),
            sale_date: Some(date(2023, 1, day)),
            sale_price: Some(price),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_occurrence_wins() {
        let first = sale("123 Main St", 1, 300_000, "Fulton");
        let second = sale("123 MAIN ST ", 1, 300_000, "DeKalb");
        let outcome = dedupe_sales(vec![first.clone(), second]);

        assert_eq!(outcome.duplicates_removed, 1);
        assert_eq!(outcome.unique.len(), 1);
        // The survivor is the first record, descriptive fields included.
        assert_eq!(outcome.unique[0].county.as_deref(), Some("Fulton"));
    }

    #[test]
    fn test_distinct_keys_all_survive_in_order() {
        let batch = vec![
            sale("1 Oak Ave", 1, 200_000, "Cobb"),
            sale("2 Oak Ave", 1, 200_000, "Cobb"),
            sale("1 Oak Ave", 2, 200_000, "Cobb"),
        ];
        let outcome = dedupe_sales(batch.clone());
        assert_eq!(outcome.duplicates_removed, 0);
        assert_eq!(outcome.unique, batch);
    }

    #[test]
    fn test_incomplete_key_records_always_survive() {
        let complete = sale("123 Main St", 1, 300_000, "Fulton");
        let mut missing_price = complete.clone();
        missing_price.sale_price = None;

        let outcome = dedupe_sales(vec![
            complete.clone(),
            missing_price.clone(),
            missing_price.clone(),
        ]);

        // Identical except for the missing price: never collapsed.
        assert_eq!(outcome.duplicates_removed, 0);
        assert_eq!(outcome.unique.len(), 3);
    }

    #[test]
    fn test_duplicate_count_with_repeats() {
        let a = sale("123 Main St", 1, 300_000, "Fulton");
        let outcome = dedupe_sales(vec![a.clone(), a.clone(), a.clone()]);
        assert_eq!(outcome.duplicates_removed, 2);
        assert_eq!(outcome.unique.len(), 1);
    }

    #[test]
    fn test_empty_batch() {
        let outcome = dedupe_sales(Vec::new());
        assert_eq!(outcome.duplicates_removed, 0);
        assert!(outcome.unique.is_empty());
    }
}
