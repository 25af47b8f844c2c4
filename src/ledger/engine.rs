//! Add and spend rules over the ledger store.

use tracing::{debug, warn};

use super::{
    DebitRecord, LedgerError, LedgerStore, Points, Result, SpendPolicy, Timestamp, Transaction,
};

/// Outcome of a batch add. Rejected elements leave the rest untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub accepted: usize,
    pub rejected: Vec<RejectedTransaction>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// A batch element that failed to apply, by position in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTransaction {
    pub index: usize,
    pub error: LedgerError,
}

/// Sole mutator of a [`LedgerStore`].
#[derive(Debug, Clone, Default)]
pub struct AllocationEngine {
    store: LedgerStore,
    policy: SpendPolicy,
}

impl AllocationEngine {
    pub fn new(policy: SpendPolicy) -> Self {
        Self {
            store: LedgerStore::new(),
            policy,
        }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn policy(&self) -> SpendPolicy {
        self.policy
    }

    /// Record one transaction.
    ///
    /// The payer's balance always moves by `points`. How the entry is filed
    /// depends on the payer's head entry:
    /// - head is a debit: debits merge into it (keeping the later timestamp),
    ///   earlier credits net against it and take over the head slot, later
    ///   credits are filed behind it.
    /// - head is a credit: debits at or after it draw from it directly,
    ///   anything else is filed by timestamp.
    pub fn add(&mut self, transaction: Transaction) -> Result<()> {
        if transaction.payer.is_empty() {
            warn!(points = transaction.points, "rejected transaction without payer");
            return Err(LedgerError::invalid_transaction("payer is empty"));
        }

        let payer = transaction.payer.as_str();
        let points = transaction.points;
        let timestamp = transaction.timestamp;

        if !self.fits(payer, points, timestamp) {
            warn!(payer = %payer, points, "rejected transaction overflowing balance");
            return Err(LedgerError::BalanceOverflow {
                payer: payer.to_string(),
            });
        }
        self.store.adjust_balance(payer, points);

        let Some(earliest) = self.store.earliest_entry(payer) else {
            // New payer, or every entry already spent.
            self.store.insert(payer, transaction.entry());
            debug!(payer = %payer, points, %timestamp, "opened ledger entry");
            return Ok(());
        };

        if earliest.points <= 0 {
            if transaction.is_debit() {
                self.store.mutate_earliest(payer, |head| {
                    head.points += points;
                    head.timestamp = head.timestamp.max(timestamp);
                });
                debug!(payer = %payer, points, "merged debit into outstanding debit");
            } else if timestamp < earliest.timestamp {
                self.store.mutate_earliest(payer, |head| {
                    head.points += points;
                    head.timestamp = timestamp;
                });
                debug!(payer = %payer, points, "netted earlier credit against outstanding debit");
            } else {
                self.store.insert(payer, transaction.entry());
                debug!(payer = %payer, points, %timestamp, "filed credit behind outstanding debit");
            }
        } else if transaction.is_debit() && timestamp >= earliest.timestamp {
            self.store.mutate_earliest(payer, |head| head.points += points);
            debug!(payer = %payer, points, "drew debit from earliest credit");
        } else {
            self.store.insert(payer, transaction.entry());
            debug!(payer = %payer, points, %timestamp, "filed entry");
        }

        Ok(())
    }

    /// Whether `points` can be added without overflowing the payer's balance,
    /// the store total, or the entry that will receive them.
    fn fits(&self, payer: &str, points: Points, timestamp: Timestamp) -> bool {
        let balance = self.store.balance(payer).unwrap_or(0);
        if balance.checked_add(points).is_none()
            || self.store.total_balance().checked_add(points).is_none()
        {
            return false;
        }

        let merges_into_head = self.store.earliest_entry(payer).filter(|head| {
            if head.points <= 0 {
                points <= 0 || timestamp < head.timestamp
            } else {
                points <= 0 && timestamp >= head.timestamp
            }
        });
        let target = match merges_into_head {
            Some(head) => head.points,
            None => self.store.points_at(payer, timestamp).unwrap_or(0),
        };
        target.checked_add(points).is_some()
    }

    /// Record every transaction of a non-empty batch, each on its own.
    pub fn add_multiple(&mut self, transactions: Vec<Transaction>) -> Result<BatchReport> {
        if transactions.is_empty() {
            warn!("rejected empty transaction batch");
            return Err(LedgerError::invalid_transaction("batch is empty"));
        }

        let mut report = BatchReport::default();
        for (index, transaction) in transactions.into_iter().enumerate() {
            match self.add(transaction) {
                Ok(()) => report.accepted += 1,
                Err(error) => report.rejected.push(RejectedTransaction { index, error }),
            }
        }
        Ok(report)
    }

    /// Draw `points` from the oldest credits across all payers.
    ///
    /// Returns one debit record per entry drawn from, in draw order. When the
    /// pool runs dry the error carries the records drawn so far; under
    /// [`SpendPolicy::Partial`] those draws stay applied.
    pub fn spend(&mut self, points: Points) -> Result<Vec<DebitRecord>> {
        if points < 0 {
            return Err(LedgerError::InvalidSpend(points));
        }

        if self.policy == SpendPolicy::AllOrNothing {
            let available = self.store.spendable_total();
            if points > available {
                warn!(requested = points, available, "insufficient balance, spend refused");
                return Err(LedgerError::InsufficientBalance {
                    requested: points,
                    shortfall: points - available,
                    debits: Vec::new(),
                });
            }
        }

        let mut debits = Vec::new();
        let mut remaining = points;

        while remaining > 0 {
            let Some((payer, earliest)) = self.store.earliest_spendable() else {
                warn!(requested = points, shortfall = remaining, "insufficient balance");
                return Err(LedgerError::InsufficientBalance {
                    requested: points,
                    shortfall: remaining,
                    debits,
                });
            };

            if earliest.points <= 0 {
                // Outstanding debit: settle it against the next entry and rescan.
                self.store.remove_earliest(&payer);
                self.store
                    .mutate_earliest(&payer, |next| next.points += earliest.points);
                debug!(payer = %payer, points = earliest.points, "folded outstanding debit");
                continue;
            }

            let drawn = remaining.min(earliest.points);
            if drawn == earliest.points {
                self.store.remove_earliest(&payer);
            } else {
                self.store.mutate_earliest(&payer, |head| head.points -= drawn);
            }
            self.store.adjust_balance(&payer, -drawn);
            remaining -= drawn;

            debug!(payer = %payer, drawn, remaining, "drew from earliest credit");
            debits.push(DebitRecord {
                payer,
                points: -drawn,
                timestamp: earliest.timestamp,
            });
        }

        Ok(debits)
    }
}
