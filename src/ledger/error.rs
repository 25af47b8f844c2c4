use super::{DebitRecord, Points};

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors from ledger operations. All of them are per-request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("invalid spend amount: {0}")]
    InvalidSpend(Points),

    #[error("balance overflow for payer {payer}")]
    BalanceOverflow { payer: String },

    /// `debits` holds whatever was drawn before the pool ran dry.
    #[error("insufficient balance: requested {requested}, short by {shortfall}")]
    InsufficientBalance {
        requested: Points,
        shortfall: Points,
        debits: Vec<DebitRecord>,
    },
}

impl LedgerError {
    pub fn invalid_transaction(reason: impl Into<String>) -> Self {
        LedgerError::InvalidTransaction(reason.into())
    }
}
