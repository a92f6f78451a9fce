//! Account registry, rate table and settlement of energy transactions.

use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;

use crate::account::EnergyAccount;
use crate::model::{AccountId, TransactionKind, TransactionRecord, TxId};
use crate::transaction::{EnergyTransaction, Outcome, TransactionError};

/// Default rates in credits per kWh. Donation has none and resolves to 0.0.
pub const DEFAULT_RATES: [(TransactionKind, f64); 4] = [
    (TransactionKind::Buyback, 0.15),
    (TransactionKind::Loan, 0.10),
    (TransactionKind::Purchase, 0.20),
    (TransactionKind::Transfer, 0.05),
];

/// Result of [`EnergyMarketplace::settle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Settled(TransactionRecord),
    /// Nothing was mutated or recorded.
    InsufficientSurplus { available: f64, requested: f64 },
}

/// Holds every known account and the current rates.
///
/// All mutation goes through `&mut self`, so one marketplace settles one
/// transaction at a time.
#[derive(Debug)]
pub struct EnergyMarketplace {
    accounts: HashMap<AccountId, EnergyAccount>,
    rates: HashMap<TransactionKind, f64>,
    /// Settled transactions, oldest first. Kept for the lifetime of the
    /// marketplace; durable history belongs to the `AccountStore`.
    transactions: Vec<TransactionRecord>,
    next_tx_id: TxId,
}

impl EnergyMarketplace {
    pub fn new() -> Self {
        Self::with_rates(DEFAULT_RATES)
    }

    pub fn with_rates(rates: impl IntoIterator<Item = (TransactionKind, f64)>) -> Self {
        Self {
            accounts: HashMap::new(),
            rates: rates.into_iter().collect(),
            transactions: Vec::new(),
            next_tx_id: 1,
        }
    }

    /// Insert the account, replacing any account with the same id.
    pub fn register_account(&mut self, account: EnergyAccount) -> Option<EnergyAccount> {
        self.accounts.insert(account.id().to_string(), account)
    }

    pub fn get_account(&self, id: &str) -> Option<&EnergyAccount> {
        self.accounts.get(id)
    }

    pub fn get_account_mut(&mut self, id: &str) -> Option<&mut EnergyAccount> {
        self.accounts.get_mut(id)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &EnergyAccount> + '_ {
        self.accounts.values()
    }

    pub fn set_rate(&mut self, kind: TransactionKind, rate: f64) {
        self.rates.insert(kind, rate);
    }

    /// Rate for a type name; unknown names and unset kinds give 0.0.
    pub fn get_rate(&self, kind: &str) -> f64 {
        kind.parse().map(|kind| self.rate(kind)).unwrap_or(0.0)
    }

    pub fn rate(&self, kind: TransactionKind) -> f64 {
        self.rates.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn transactions(&self) -> &[TransactionRecord] {
        &self.transactions
    }

    /// Newest first, transactions sent by `account`.
    ///
    /// Walks the in-memory log backwards, so the cost grows with the number of
    /// trades settled since startup.
    pub fn recent_transactions(&self, account: &str, limit: usize) -> Vec<&TransactionRecord> {
        self.transactions
            .iter()
            .rev()
            .filter(|record| record.from == account)
            .take(limit)
            .collect()
    }

    /// Execute `tx` against the registered accounts it names and record it.
    ///
    /// Participants are taken out of the registry for the duration of the
    /// execution and always put back, whatever the result.
    pub fn settle(&mut self, tx: &mut EnergyTransaction) -> Result<Settlement, TransactionError> {
        if tx.to() == Some(tx.from()) {
            return Err(TransactionError::SameAccount(tx.from().to_string()));
        }

        let mut from = self
            .accounts
            .remove(tx.from())
            .ok_or_else(|| TransactionError::UnknownAccount(tx.from().to_string()))?;

        let mut to = match tx.to() {
            Some(id) => match self.accounts.remove(id) {
                Some(account) => Some(account),
                None => {
                    self.accounts.insert(from.id().to_string(), from);
                    return Err(TransactionError::UnknownAccount(id.to_string()));
                }
            },
            None => None,
        };

        let result = tx.execute(&mut from, to.as_mut());

        self.accounts.insert(from.id().to_string(), from);
        if let Some(to) = to {
            self.accounts.insert(to.id().to_string(), to);
        }

        match result? {
            Outcome::Executed => {
                let record = self.record(tx);
                debug!(tx = record.id, kind = %record.kind, "transaction recorded");
                Ok(Settlement::Settled(record))
            }
            Outcome::InsufficientSurplus {
                available,
                requested,
            } => Ok(Settlement::InsufficientSurplus {
                available,
                requested,
            }),
        }
    }

    fn record(&mut self, tx: &EnergyTransaction) -> TransactionRecord {
        let record = TransactionRecord {
            id: self.next_tx_id,
            kind: tx.kind(),
            from: tx.from().to_string(),
            to: tx.to().map(str::to_string),
            amount: tx.amount(),
            rate: tx.rate(),
            credits: tx.credits_transferred(),
            timestamp: Utc::now(),
        };
        self.next_tx_id += 1;
        self.transactions.push(record.clone());
        record
    }
}

impl Default for EnergyMarketplace {
    fn default() -> Self {
        Self::new()
    }
}
