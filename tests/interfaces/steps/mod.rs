//! Step definitions for the ledger interface tests.

pub mod ledger;
