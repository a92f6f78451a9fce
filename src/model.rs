//! Core domain types shared by the marketplace and its adapters.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transaction::TransactionError;

/// Account identifier (the participant's energy number).
pub type AccountId = String;

/// Transaction record identifier, assigned by the marketplace.
pub type TxId = u64;

/// The kinds of energy transfer the marketplace accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Sell surplus back to the platform for credits. Has no recipient.
    Buyback,
    /// Lend surplus to a peer, earning credits.
    Loan,
    /// Give surplus to a peer, settled at rate 0 unless configured.
    Donation,
    Purchase,
    Transfer,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 5] = [
        TransactionKind::Buyback,
        TransactionKind::Loan,
        TransactionKind::Donation,
        TransactionKind::Purchase,
        TransactionKind::Transfer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Buyback => "buyback",
            TransactionKind::Loan => "loan",
            TransactionKind::Donation => "donation",
            TransactionKind::Purchase => "purchase",
            TransactionKind::Transfer => "transfer",
        }
    }

    /// Every kind except buyback moves energy to a peer account.
    pub fn requires_recipient(self) -> bool {
        !matches!(self, TransactionKind::Buyback)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TransactionError::InvalidTransactionType(s.to_string()))
    }
}

/// A trade request, before any validation against account state.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeOrder {
    pub kind: TransactionKind,
    pub from: AccountId,
    pub to: Option<AccountId>,
    pub amount: f64,
    /// Overrides the marketplace rate for this kind when set.
    pub rate: Option<f64>,
}

/// An input of the exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Add an account to the registry, replacing any account with the same id.
    Register {
        account: AccountId,
        name: String,
        generated: f64,
        consumed: f64,
    },
    /// Overwrite the given meter readings.
    UpdateEnergy {
        account: AccountId,
        generated: Option<f64>,
        consumed: Option<f64>,
    },
    /// Grant credits.
    AddCredits { account: AccountId, amount: f64 },
    /// Spend credits; refused when the balance is too low.
    RedeemCredits { account: AccountId, amount: f64 },
    /// Move surplus energy.
    Trade(TradeOrder),
}

impl Request {
    /// The account the request acts on.
    pub fn account(&self) -> &str {
        match self {
            Request::Register { account, .. }
            | Request::UpdateEnergy { account, .. }
            | Request::AddCredits { account, .. }
            | Request::RedeemCredits { account, .. } => account,
            Request::Trade(order) => &order.from,
        }
    }
}

/// Immutable record of a settled transaction, handed to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TxId,
    pub kind: TransactionKind,
    pub from: AccountId,
    pub to: Option<AccountId>,
    pub amount: f64,
    pub rate: f64,
    pub credits: f64,
    pub timestamp: DateTime<Utc>,
}
