//! Ordered per-payer entries and the running balance index.
//!
//! The store does no validation of its own. The allocation engine keeps the
//! entry invariants: at most one non-positive entry per payer, always first,
//! and each payer's balance equal to the sum of its entries.

use std::collections::BTreeMap;

use super::{LedgerEntry, Points, Timestamp};

/// One payer's unconsumed entries, keyed and ordered by timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayerLedger {
    entries: BTreeMap<Timestamp, Points>,
}

impl PayerLedger {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn earliest(&self) -> Option<LedgerEntry> {
        self.entries
            .first_key_value()
            .map(|(timestamp, points)| LedgerEntry {
                points: *points,
                timestamp: *timestamp,
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = LedgerEntry> + '_ {
        self.entries.iter().map(|(timestamp, points)| LedgerEntry {
            points: *points,
            timestamp: *timestamp,
        })
    }

    pub fn sum(&self) -> Points {
        self.entries.values().sum()
    }

    /// Head entry if a spend can draw from this ledger, either directly or
    /// after folding a leading debit into the entries behind it.
    fn spendable_head(&self) -> Option<LedgerEntry> {
        let head = self.earliest()?;
        if head.points <= 0 && self.len() == 1 {
            return None;
        }
        Some(head)
    }

    /// Timestamps are unique: an entry landing on an occupied timestamp is
    /// summed into the existing one.
    fn insert(&mut self, entry: LedgerEntry) {
        *self.entries.entry(entry.timestamp).or_insert(0) += entry.points;
    }

    fn remove_earliest(&mut self) -> Option<LedgerEntry> {
        self.entries
            .pop_first()
            .map(|(timestamp, points)| LedgerEntry { points, timestamp })
    }

    fn mutate_earliest<F>(&mut self, f: F) -> Option<LedgerEntry>
    where
        F: FnOnce(&mut LedgerEntry),
    {
        let mut entry = self.remove_earliest()?;
        f(&mut entry);

        // A non-positive head must stay first. If its timestamp moved past
        // later credits, net those credits into it, oldest first.
        while entry.points <= 0 {
            let Some(next) = self.entries.first_entry() else {
                break;
            };
            if *next.key() > entry.timestamp {
                break;
            }
            let credit_timestamp = *next.key();
            entry.points += next.remove();
            if entry.points > 0 {
                entry.timestamp = credit_timestamp;
            }
        }

        self.insert(entry);
        self.earliest()
    }
}

/// Per-payer ledgers plus the balance index.
#[derive(Debug, Clone, Default)]
pub struct LedgerStore {
    ledgers: BTreeMap<String, PayerLedger>,
    balances: BTreeMap<String, Points>,
    total: Points,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of every payer's balance.
    pub fn total_balance(&self) -> Points {
        self.total
    }

    /// Snapshot of the balance index, ordered by payer.
    pub fn balance_detail(&self) -> BTreeMap<String, Points> {
        self.balances.clone()
    }

    pub fn balance(&self, payer: &str) -> Option<Points> {
        self.balances.get(payer).copied()
    }

    /// Points a spend could still draw. Payers in debt contribute nothing.
    /// Saturates at `Points::MAX`, which no spend can exceed.
    pub fn spendable_total(&self) -> Points {
        self.balances
            .values()
            .fold(0, |total: Points, balance| total.saturating_add((*balance).max(0)))
    }

    pub fn ledger(&self, payer: &str) -> Option<&PayerLedger> {
        self.ledgers.get(payer)
    }

    /// Copy of a payer's entries in timestamp order.
    pub fn entries(&self, payer: &str) -> Option<Vec<LedgerEntry>> {
        self.ledgers.get(payer).map(|ledger| ledger.iter().collect())
    }

    pub fn payers(&self) -> impl Iterator<Item = &str> {
        self.ledgers.keys().map(String::as_str)
    }

    pub(crate) fn earliest_entry(&self, payer: &str) -> Option<LedgerEntry> {
        self.ledgers.get(payer).and_then(PayerLedger::earliest)
    }

    /// Points held by the payer's entry at exactly `timestamp`.
    pub(crate) fn points_at(&self, payer: &str, timestamp: Timestamp) -> Option<Points> {
        self.ledgers
            .get(payer)
            .and_then(|ledger| ledger.entries.get(&timestamp).copied())
    }

    /// Inserts into the payer's ledger, creating it on first use.
    pub(crate) fn insert(&mut self, payer: &str, entry: LedgerEntry) {
        if let Some(ledger) = self.ledgers.get_mut(payer) {
            ledger.insert(entry);
            return;
        }
        let mut ledger = PayerLedger::default();
        ledger.insert(entry);
        self.ledgers.insert(payer.to_string(), ledger);
        self.balances.entry(payer.to_string()).or_insert(0);
    }

    pub(crate) fn remove_earliest(&mut self, payer: &str) -> Option<LedgerEntry> {
        self.ledgers
            .get_mut(payer)
            .and_then(PayerLedger::remove_earliest)
    }

    /// Applies `f` to the payer's head entry and re-files it under its
    /// (possibly new) timestamp. Returns the resulting head.
    pub(crate) fn mutate_earliest<F>(&mut self, payer: &str, f: F) -> Option<LedgerEntry>
    where
        F: FnOnce(&mut LedgerEntry),
    {
        self.ledgers
            .get_mut(payer)
            .and_then(|ledger| ledger.mutate_earliest(f))
    }

    /// Moves the payer's balance and the store total. The engine checks
    /// both for overflow first.
    pub(crate) fn adjust_balance(&mut self, payer: &str, delta: Points) {
        *self.balances.entry(payer.to_string()).or_insert(0) += delta;
        self.total += delta;
    }

    /// The spendable payer whose head entry is oldest. Equal timestamps go to
    /// the payer that sorts first.
    pub(crate) fn earliest_spendable(&self) -> Option<(String, LedgerEntry)> {
        let mut selected: Option<(&String, LedgerEntry)> = None;
        for (payer, ledger) in &self.ledgers {
            let Some(head) = ledger.spendable_head() else {
                continue;
            };
            match selected {
                Some((_, best)) if best.timestamp <= head.timestamp => {}
                _ => selected = Some((payer, head)),
            }
        }
        selected.map(|(payer, head)| (payer.clone(), head))
    }
}
