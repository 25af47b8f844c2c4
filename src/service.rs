//! Shared handle to the allocation engine.
//!
//! Every mutation runs under the write lock for its whole read-modify-write
//! sequence; reads take the read lock, so no reader ever sees a half-applied
//! add or spend.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::ledger::{
    AllocationEngine, BatchReport, DebitRecord, LedgerEntry, Points, Result, SpendPolicy,
    Transaction,
};

/// Cloneable, process-wide points service.
#[derive(Debug, Clone, Default)]
pub struct PointsService {
    engine: Arc<RwLock<AllocationEngine>>,
}

impl PointsService {
    pub fn new(policy: SpendPolicy) -> Self {
        Self {
            engine: Arc::new(RwLock::new(AllocationEngine::new(policy))),
        }
    }

    pub async fn spend_policy(&self) -> SpendPolicy {
        self.engine.read().await.policy()
    }

    pub async fn total_balance(&self) -> Points {
        self.engine.read().await.store().total_balance()
    }

    pub async fn balance_detail(&self) -> BTreeMap<String, Points> {
        self.engine.read().await.store().balance_detail()
    }

    /// Entries for one payer, or `None` if the payer was never seen.
    pub async fn ledger(&self, payer: &str) -> Option<Vec<LedgerEntry>> {
        self.engine.read().await.store().entries(payer)
    }

    pub async fn add(&self, transaction: Transaction) -> Result<()> {
        let payer = transaction.payer.clone();
        let points = transaction.points;
        self.engine.write().await.add(transaction)?;
        info!(payer = %payer, points, "transaction added");
        Ok(())
    }

    /// The whole batch is applied under one lock acquisition.
    pub async fn add_multiple(&self, transactions: Vec<Transaction>) -> Result<BatchReport> {
        let count = transactions.len();
        let report = self.engine.write().await.add_multiple(transactions)?;
        if report.is_complete() {
            info!(count, "transaction batch added");
        } else {
            for rejected in &report.rejected {
                warn!(index = rejected.index, error = %rejected.error, "batch element rejected");
            }
            info!(
                count,
                accepted = report.accepted,
                "transaction batch partially added"
            );
        }
        Ok(report)
    }

    pub async fn spend(&self, points: Points) -> Result<Vec<DebitRecord>> {
        let debits = self.engine.write().await.spend(points)?;
        info!(points, records = debits.len(), "points spent");
        Ok(debits)
    }
}
