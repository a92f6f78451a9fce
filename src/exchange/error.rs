//! Error types for request processing.

use thiserror::Error;

use crate::model::{AccountId, TransactionKind, TxId};
use crate::store::StoreError;
use crate::transaction::TransactionError;

/// Top-level error returned by [`Exchange::apply`](super::Exchange::apply).
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("invalid amount {0}")]
    InvalidAmount(f64),

    #[error("{0} requires a recipient")]
    MissingRecipient(TransactionKind),

    #[error("{0} does not take a recipient")]
    UnexpectedRecipient(TransactionKind),

    #[error("account {0} cannot trade with itself")]
    SelfTransfer(AccountId),

    #[error("Insufficient surplus energy for account {account}: available {available}, requested {requested}")]
    InsufficientSurplus {
        account: AccountId,
        available: f64,
        requested: f64,
    },

    #[error("insufficient credits for account {account}: balance {balance}, requested {requested}")]
    InsufficientCredits {
        account: AccountId,
        balance: f64,
        requested: f64,
    },

    #[error("transaction failed: {0}")]
    Transaction(#[from] TransactionError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("transaction {tx} settled but not persisted: {source}")]
    NotPersisted { tx: TxId, source: StoreError },
}

impl ExchangeError {
    /// Whether the error comes from a collaborator or from misuse, rather than
    /// from a business rule rejecting the request.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            Self::Transaction(_) | Self::Store(_) | Self::NotPersisted { .. }
        )
    }
}
