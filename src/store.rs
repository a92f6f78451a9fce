//! Persistence seam for accounts and transaction records.

use std::collections::HashMap;

use thiserror::Error;

use crate::account::EnergyAccount;
use crate::model::{AccountId, TransactionRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Where accounts live between requests.
///
/// The exchange loads unknown accounts through `load_account`, saves every
/// account it mutates, and appends one record per settled transaction.
pub trait AccountStore {
    fn load_account(&self, id: &str) -> Result<Option<EnergyAccount>, StoreError>;

    fn save_account(&mut self, account: &EnergyAccount) -> Result<(), StoreError>;

    fn append_transaction_record(&mut self, record: &TransactionRecord) -> Result<(), StoreError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: HashMap<AccountId, EnergyAccount>,
    records: Vec<TransactionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, e.g. with accounts persisted by a previous run.
    pub fn with_accounts(accounts: impl IntoIterator<Item = EnergyAccount>) -> Self {
        Self {
            accounts: accounts
                .into_iter()
                .map(|account| (account.id().to_string(), account))
                .collect(),
            records: Vec::new(),
        }
    }

    pub fn account(&self, id: &str) -> Option<&EnergyAccount> {
        self.accounts.get(id)
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }
}

impl AccountStore for MemoryStore {
    fn load_account(&self, id: &str) -> Result<Option<EnergyAccount>, StoreError> {
        Ok(self.accounts.get(id).cloned())
    }

    fn save_account(&mut self, account: &EnergyAccount) -> Result<(), StoreError> {
        self.accounts
            .insert(account.id().to_string(), account.clone());
        Ok(())
    }

    fn append_transaction_record(&mut self, record: &TransactionRecord) -> Result<(), StoreError> {
        self.records.push(record.clone());
        Ok(())
    }
}
