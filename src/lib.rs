pub mod account;
pub mod calculator;
pub mod config;
pub mod csv;
pub mod exchange;
pub mod marketplace;
pub mod model;
pub mod notify;
pub mod store;
pub mod transaction;

pub use account::{AccountMetrics, EnergyAccount};
pub use calculator::EnergyCalculator;
pub use config::MarketConfig;
pub use exchange::{Exchange, ExchangeError};
pub use marketplace::{EnergyMarketplace, Settlement};
pub use model::{AccountId, Request, TradeOrder, TransactionKind, TransactionRecord, TxId};
pub use notify::{LogNotifier, MarketEvent, Notifier, TransactionReport};
pub use store::{AccountStore, MemoryStore};
pub use transaction::{EnergyTransaction, Outcome, TransactionError};
