//! Sales Reconciliation
//!
//! FIFO synchronization of newly fetched sales into the long-lived sales
//! table: prune expired rows, deduplicate the incoming batch, remove
//! persisted rows the batch supersedes, insert, and report. Pruning and
//! duplicate resolution recover locally from store failures and contribute
//! whatever partial count they achieved; the cycle always proceeds to
//! insertion. There is no rollback.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::EtlConfig;
use crate::domain::entities::sale::SaleRecord;
use crate::domain::services::batch_dedup::dedupe_sales;
use crate::domain::services::matching_key::MatchingKey;
use crate::persistence::models::PersistedSaleKey;
use crate::persistence::sales_repository::SalesRepository;
use crate::persistence::DatabaseError;

/// Outcome of one recoverable reconciliation stage. A failed stage reports
/// how many rows took effect before the failure; repeated runs converge the
/// store back toward the invariants it missed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed(u64),
    Failed { completed: u64 },
}

impl StageOutcome {
    pub fn count(&self) -> u64 {
        match self {
            StageOutcome::Completed(count) => *count,
            StageOutcome::Failed { completed } => *completed,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed { .. })
    }
}

/// Final accounting for one reconciliation cycle.
#[derive(Debug)]
pub struct ReconciliationSummary {
    pub pruned: StageOutcome,
    pub intra_batch_duplicates: u64,
    pub existing_duplicates: StageOutcome,
    pub inserted: u64,
}

impl ReconciliationSummary {
    /// Net row-count change: inserted − (pruned + existing duplicates removed).
    pub fn net_change(&self) -> i64 {
        self.inserted as i64
            - (self.pruned.count() + self.existing_duplicates.count()) as i64
    }
}

/// Runs one reconciliation cycle against the sales table. Owns the store
/// handle for the duration of the cycle; expects to be the only writer.
pub struct SalesReconciler {
    repo: SalesRepository,
    config: EtlConfig,
}

impl SalesReconciler {
    pub fn new(repo: SalesRepository, config: &EtlConfig) -> Self {
        Self {
            repo,
            config: config.clone(),
        }
    }

    /// Prune, dedupe, resolve, insert, summarize. Insert failures propagate;
    /// everything before insertion is best-effort.
    pub async fn reconcile(
        &self,
        today: NaiveDate,
        as_of: &str,
        incoming: Vec<SaleRecord>,
    ) -> Result<ReconciliationSummary, DatabaseError> {
        info!(
            "Reconciling {} fetched sales (retaining {} months)",
            incoming.len(),
            self.config.retention_window
        );

        let pruned = self.prune_expired(today).await;

        let dedup = dedupe_sales(incoming);

        let existing_duplicates = self.resolve_existing(&dedup.unique).await;

        let inserted = self
            .repo
            .insert_batch(&dedup.unique, as_of, self.config.insert_batch_size)
            .await?;

        let summary = ReconciliationSummary {
            pruned,
            intra_batch_duplicates: dedup.duplicates_removed,
            existing_duplicates,
            inserted,
        };
        info!(
            "Sales FIFO summary: pruned={} internal_duplicates={} existing_duplicates={} inserted={} net_change={:+}",
            summary.pruned.count(),
            summary.intra_batch_duplicates,
            summary.existing_duplicates.count(),
            summary.inserted,
            summary.net_change()
        );
        Ok(summary)
    }

    /// Delete sales older than the rolling cutoff. Runs every cycle,
    /// independent of the incoming batch.
    async fn prune_expired(&self, today: NaiveDate) -> StageOutcome {
        let cutoff = self.config.retention_cutoff(today);
        info!(
            "Removing sales older than {} (keeping {} months)",
            cutoff, self.config.retention_window
        );

        match self.repo.delete_older_than(cutoff).await {
            Ok(removed) => {
                info!("Deleted {} expired sales", removed);
                StageOutcome::Completed(removed)
            }
            Err(e) => {
                warn!("Could not prune expired sales, continuing: {}", e);
                StageOutcome::Failed { completed: 0 }
            }
        }
    }

    /// Remove persisted sales whose matching key collides with an incoming
    /// record, making the incoming batch authoritative.
    ///
    /// One range query bounded by the incoming batch's date span replaces a
    /// per-record existence check; matching happens in memory against the
    /// incoming key set.
    async fn resolve_existing(&self, incoming: &[SaleRecord]) -> StageOutcome {
        let mut keys: HashSet<MatchingKey> = HashSet::new();
        let mut span: Option<(NaiveDate, NaiveDate)> = None;
        for sale in incoming {
            if let Some(key) = MatchingKey::for_sale(sale) {
                let date = key.sale_date;
                span = Some(match span {
                    None => (date, date),
                    Some((start, end)) => (start.min(date), end.max(date)),
                });
                keys.insert(key);
            }
        }
        let (start, end) = match span {
            Some(span) => span,
            // Nothing with a complete key: nothing can collide.
            None => return StageOutcome::Completed(0),
        };

        let candidates = match self.repo.fetch_key_fields_in_range(start, end).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Could not check for existing duplicate sales, continuing: {}", e);
                return StageOutcome::Failed { completed: 0 };
            }
        };
        info!(
            "Checking {} existing sales between {} and {} against {} incoming keys",
            candidates.len(),
            start,
            end,
            keys.len()
        );

        let mut matched: Vec<PersistedSaleKey> = Vec::new();
        for row in candidates {
            if let (Some(address), Some(sale_date), Some(sale_price)) =
                (row.address, row.sale_date, row.sale_price)
            {
                if let Some(key) = MatchingKey::new(&address, sale_date, sale_price) {
                    if keys.contains(&key) {
                        // Delete by the stored raw fields, not the normalized key.
                        matched.push(PersistedSaleKey {
                            address,
                            sale_date,
                            sale_price,
                        });
                    }
                }
            }
        }
        info!("Found {} existing duplicates to remove", matched.len());

        let mut deleted = 0u64;
        for chunk in matched.chunks(self.config.delete_batch_size.max(1)) {
            match self.repo.delete_matching(chunk).await {
                Ok(removed) => deleted += removed,
                Err(e) => {
                    warn!(
                        "Could not delete existing duplicate sales, continuing: {}",
                        e
                    );
                    return StageOutcome::Failed { completed: deleted };
                }
            }
        }
        StageOutcome::Completed(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;

    #[test]
    fn test_net_change_accounting() {
        let summary = ReconciliationSummary {
            pruned: StageOutcome::Completed(10),
            intra_batch_duplicates: 3,
            existing_duplicates: StageOutcome::Completed(7),
            inserted: 40,
        };
        assert_eq!(summary.net_change(), 23);
    }

    #[test]
    fn test_net_change_can_be_negative() {
        let summary = ReconciliationSummary {
            pruned: StageOutcome::Completed(50),
            intra_batch_duplicates: 0,
            existing_duplicates: StageOutcome::Completed(5),
            inserted: 10,
        };
        assert_eq!(summary.net_change(), -45);
    }

    #[test]
    fn test_failed_stage_reports_partial_count() {
        let outcome = StageOutcome::Failed { completed: 4 };
        assert!(outcome.is_failed());
        assert_eq!(outcome.count(), 4);
        assert!(!StageOutcome::Completed(4).is_failed());
    }

    #[tokio::test]
    async fn test_reconcile_empty_batch_only_prunes() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let config = EtlConfig::default();
        let reconciler = SalesReconciler::new(SalesRepository::new(pool), &config);

        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let summary = reconciler
            .reconcile(today, "2025.06.15", Vec::new())
            .await
            .unwrap();

        assert_eq!(summary.pruned, StageOutcome::Completed(0));
        assert_eq!(summary.intra_batch_duplicates, 0);
        assert_eq!(summary.existing_duplicates, StageOutcome::Completed(0));
        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.net_change(), 0);
    }
}
