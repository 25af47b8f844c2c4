//! Points Ledger - payer reward points with oldest-first spending
//!
//! Tracks a running point balance per payer and spends from the combined
//! pool by always drawing the oldest unconsumed credit first, so no payer's
//! balance is driven negative by a spend.

pub mod config;
pub mod ledger;
pub mod service;
pub mod transport;
pub mod utils;

pub use ledger::{
    AllocationEngine, DebitRecord, LedgerEntry, LedgerError, LedgerStore, Points, SpendPolicy,
    Timestamp, Transaction,
};
pub use service::PointsService;
