//! Payer ledgers and the FIFO allocation engine.
//!
//! Points arrive as [`Transaction`]s tagged with a payer and a timestamp.
//! Each payer keeps its unconsumed credits in timestamp order; a spend drains
//! the oldest credit across all payers first, so no payer is overdrawn.
//!
//! - [`LedgerStore`]: per-payer ordered entries plus the balance index.
//! - [`AllocationEngine`]: the only mutator of the store (`add`, `spend`).

mod engine;
mod error;
mod store;


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use engine::{AllocationEngine, BatchReport, RejectedTransaction};
pub use error::{LedgerError, Result};
pub use store::{LedgerStore, PayerLedger};

/// Signed point amount. Positive values are credits.
pub type Points = i64;

/// Instant a transaction took effect.
pub type Timestamp = DateTime<Utc>;

/// A single credit or debit reported by a payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub payer: String,
    pub points: Points,
    pub timestamp: Timestamp,
}

impl Transaction {
    pub fn new(payer: impl Into<String>, points: Points, timestamp: Timestamp) -> Self {
        Self {
            payer: payer.into(),
            points,
            timestamp,
        }
    }

    /// Zero counts as a debit: it never adds spendable points.
    pub fn is_debit(&self) -> bool {
        self.points <= 0
    }

    fn entry(&self) -> LedgerEntry {
        LedgerEntry {
            points: self.points,
            timestamp: self.timestamp,
        }
    }
}

/// One slot in a payer's ordered ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub points: Points,
    pub timestamp: Timestamp,
}

/// Points drawn from one payer entry by a spend. `points` is always negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitRecord {
    pub payer: String,
    pub points: Points,
    pub timestamp: Timestamp,
}

/// What a spend does when the pool cannot cover the full request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendPolicy {
    /// Keep whatever was drawn before the pool ran dry.
    #[default]
    Partial,
    /// Refuse the spend up front and leave every balance untouched.
    AllOrNothing,
}
