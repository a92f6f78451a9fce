//! Request processing on top of the marketplace.
//!
//! The exchange owns the marketplace together with its persistence and
//! notification collaborators. Requests are applied one at a time, either
//! directly or from an async stream, which serializes every
//! "check surplus, execute, persist" sequence per account.

use tokio_stream::{Stream, StreamExt};
use tracing::{error, info, warn};

use crate::account::{AccountMetrics, EnergyAccount};
use crate::config::MarketConfig;
use crate::marketplace::{EnergyMarketplace, Settlement};
use crate::model::{Request, TradeOrder, TransactionRecord};
use crate::notify::{LogNotifier, MarketEvent, Notifier, TransactionReport};
use crate::store::{AccountStore, MemoryStore, StoreError};
use crate::transaction::EnergyTransaction;

mod error;
pub use error::ExchangeError;

/// The request processing coordinator.
pub struct Exchange<S = MemoryStore, N = LogNotifier> {
    market: EnergyMarketplace,
    store: S,
    notifier: N,
    config: MarketConfig,
}

/// Public API
impl<S: AccountStore, N: Notifier> Exchange<S, N> {
    pub fn new(config: MarketConfig, store: S, notifier: N) -> Self {
        Self {
            market: config.marketplace(),
            store,
            notifier,
            config,
        }
    }

    pub fn market(&self) -> &EnergyMarketplace {
        &self.market
    }

    /// Direct access, e.g. to change rates at runtime.
    pub fn market_mut(&mut self) -> &mut EnergyMarketplace {
        &mut self.market
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Return a registered account, loading it from the store if needed.
    pub fn account(&mut self, id: &str) -> Result<&EnergyAccount, ExchangeError> {
        self.ensure_loaded(id)?;
        self.market
            .get_account(id)
            .ok_or_else(|| ExchangeError::AccountNotFound(id.to_string()))
    }

    /// Metrics for every registered account, sorted by id.
    pub fn metrics(&self) -> Vec<AccountMetrics> {
        let mut metrics: Vec<_> = self
            .market
            .accounts()
            .map(|account| account.metrics_with(self.config.carbon_factor))
            .collect();
        metrics.sort_by(|a, b| a.account.cmp(&b.account));
        metrics
    }

    /// The configured number of most recent transactions sent by `account`.
    pub fn recent_transactions(&self, account: &str) -> Vec<&TransactionRecord> {
        self.market
            .recent_transactions(account, self.config.recent_limit)
    }

    /// Run the exchange with the given request stream
    pub async fn run(&mut self, mut stream: impl Stream<Item = Request> + Unpin) {
        while let Some(request) = stream.next().await {
            // a rejected request must not stop the exchange
            let _ = self.apply(request);
        }
    }

    /// Apply a single request on top of the current state
    pub fn apply(&mut self, request: Request) -> Result<(), ExchangeError> {
        let account = request.account().to_string();
        let (label, amount, result) = match request {
            Request::Register {
                account,
                name,
                generated,
                consumed,
            } => (
                "register",
                None,
                self.register(EnergyAccount::with_balances(
                    account, name, generated, consumed, 0.0,
                )),
            ),
            Request::UpdateEnergy {
                account,
                generated,
                consumed,
            } => ("update", None, self.update_energy(&account, generated, consumed)),
            Request::AddCredits { account, amount } => {
                ("credit", Some(amount), self.add_credits(&account, amount))
            }
            Request::RedeemCredits { account, amount } => {
                ("redeem", Some(amount), self.redeem_credits(&account, amount))
            }
            Request::Trade(order) => (
                order.kind.as_str(),
                Some(order.amount),
                self.trade(order).map(|_| ()),
            ),
        };
        Self::log_result(label, &account, amount, &result);
        result
    }

    /// Register (or replace) an account and save it.
    pub fn register(&mut self, account: EnergyAccount) -> Result<(), ExchangeError> {
        self.store.save_account(&account)?;
        let id = account.id().to_string();
        self.market.register_account(account);
        self.publish(&MarketEvent::AccountRegistered { account: id });
        Ok(())
    }

    pub fn update_energy(
        &mut self,
        id: &str,
        generated: Option<f64>,
        consumed: Option<f64>,
    ) -> Result<(), ExchangeError> {
        let account = self.account_mut(id)?;
        account.update_energy(generated, consumed);
        self.save(id)
    }

    pub fn add_credits(&mut self, id: &str, amount: f64) -> Result<(), ExchangeError> {
        self.account_mut(id)?.add_credits(amount);
        self.save(id)
    }

    /// Spend credits. Nothing changes when the balance is too low.
    pub fn redeem_credits(&mut self, id: &str, amount: f64) -> Result<(), ExchangeError> {
        let account = self.account_mut(id)?;
        if !account.deduct_credits(amount) {
            return Err(ExchangeError::InsufficientCredits {
                account: id.to_string(),
                balance: account.credits(),
                requested: amount,
            });
        }
        self.save(id)
    }

    /// Validate, settle and persist a trade:
    /// - Amount must be positive
    /// - Recipient must be present exactly when the kind moves energy to a peer
    /// - Both accounts must be known (registered or loadable) and distinct
    /// - Rate is the order's own, else the current marketplace rate
    ///
    /// `Err(NotPersisted)` means the trade was executed, recorded in memory and
    /// announced, but the store missed part of it. Retrying would execute it twice.
    pub fn trade(&mut self, order: TradeOrder) -> Result<TransactionRecord, ExchangeError> {
        if !order.amount.is_finite() || order.amount <= 0.0 {
            return Err(ExchangeError::InvalidAmount(order.amount));
        }

        match (&order.to, order.kind.requires_recipient()) {
            (None, true) => return Err(ExchangeError::MissingRecipient(order.kind)),
            (Some(_), false) => return Err(ExchangeError::UnexpectedRecipient(order.kind)),
            (Some(to), _) if *to == order.from => {
                return Err(ExchangeError::SelfTransfer(order.from));
            }
            _ => {}
        }

        self.ensure_loaded(&order.from)?;
        if let Some(to) = &order.to {
            self.ensure_loaded(to)?;
        }

        let rate = order.rate.unwrap_or_else(|| self.market.rate(order.kind));
        let mut tx = {
            let from = self.registered(&order.from)?;
            let to = match &order.to {
                Some(id) => Some(self.registered(id)?),
                None => None,
            };
            EnergyTransaction::of_kind(from, to, order.amount, order.kind, rate)
        };

        match self.market.settle(&mut tx)? {
            Settlement::Settled(record) => {
                let persisted = self.persist(&record);
                self.announce(&record);
                match persisted {
                    Ok(()) => Ok(record),
                    Err(source) => Err(ExchangeError::NotPersisted {
                        tx: record.id,
                        source,
                    }),
                }
            }
            Settlement::InsufficientSurplus {
                available,
                requested,
            } => Err(ExchangeError::InsufficientSurplus {
                account: order.from,
                available,
                requested,
            }),
        }
    }
}

/// Private API
impl<S: AccountStore, N: Notifier> Exchange<S, N> {
    /// Small helper to log `apply` results
    ///
    /// Business rejections are expected and stay at `info`; collaborator and
    /// usage faults are raised to `error`.
    fn log_result(
        request: &str,
        account: &str,
        amount: Option<f64>,
        result: &Result<(), ExchangeError>,
    ) {
        match (result, amount) {
            (Ok(()), Some(amount)) => {
                info!(account = %account, amount = amount, "{request} applied");
            }
            (Ok(()), None) => {
                info!(account = %account, "{request} applied");
            }
            (Err(e), Some(amount)) if e.is_fault() => {
                error!(account = %account, amount = amount, reason = %e, "{request} failed");
            }
            (Err(e), None) if e.is_fault() => {
                error!(account = %account, reason = %e, "{request} failed");
            }
            (Err(e), Some(amount)) => {
                info!(account = %account, amount = amount, reason = %e, "{request} skipped");
            }
            (Err(e), None) => {
                info!(account = %account, reason = %e, "{request} skipped");
            }
        }
    }

    /// Make sure `id` is in the registry, pulling it from the store if needed.
    fn ensure_loaded(&mut self, id: &str) -> Result<(), ExchangeError> {
        if self.market.get_account(id).is_some() {
            return Ok(());
        }
        let account = self
            .store
            .load_account(id)?
            .ok_or_else(|| ExchangeError::AccountNotFound(id.to_string()))?;
        self.market.register_account(account);
        Ok(())
    }

    fn registered(&self, id: &str) -> Result<&EnergyAccount, ExchangeError> {
        self.market
            .get_account(id)
            .ok_or_else(|| ExchangeError::AccountNotFound(id.to_string()))
    }

    fn account_mut(&mut self, id: &str) -> Result<&mut EnergyAccount, ExchangeError> {
        self.ensure_loaded(id)?;
        self.market
            .get_account_mut(id)
            .ok_or_else(|| ExchangeError::AccountNotFound(id.to_string()))
    }

    fn save(&mut self, id: &str) -> Result<(), ExchangeError> {
        let account = self
            .market
            .get_account(id)
            .ok_or_else(|| ExchangeError::AccountNotFound(id.to_string()))?;
        self.store.save_account(account)?;
        Ok(())
    }

    /// Save both participants and append the record.
    ///
    /// Every write is attempted; the first failure is returned.
    fn persist(&mut self, record: &TransactionRecord) -> Result<(), StoreError> {
        let mut first_error = None;
        let mut attempt = |result: Result<(), StoreError>| {
            if let Err(e) = result {
                warn!(tx = record.id, reason = %e, "store write failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        };

        for id in std::iter::once(&record.from).chain(record.to.as_ref()) {
            if let Some(account) = self.market.get_account(id) {
                attempt(self.store.save_account(account));
            }
        }
        attempt(self.store.append_transaction_record(record));

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn announce(&self, record: &TransactionRecord) {
        self.publish(&MarketEvent::TransactionCompleted(record.clone()));

        let name = self
            .market
            .get_account(&record.from)
            .map(|account| account.name().to_string())
            .unwrap_or_default();
        let report = TransactionReport::new(record, name);
        if let Err(e) = self.notifier.archive(&report) {
            warn!(tx = record.id, key = %report.key(), reason = %e, "report archival failed");
        }
    }

    fn publish(&self, event: &MarketEvent) {
        if let Err(e) = self.notifier.notify(event) {
            warn!(metric = %event.metric_name(), reason = %e, "notification failed");
        }
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new(MarketConfig::default(), MemoryStore::new(), LogNotifier)
    }
}
