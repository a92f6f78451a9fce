//! Notification and report archival seam.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::model::{AccountId, TransactionKind, TransactionRecord};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),
}

/// Something other services may want to hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketEvent {
    AccountRegistered { account: AccountId },
    TransactionCompleted(TransactionRecord),
}

impl MarketEvent {
    /// Metric name for the event, e.g. `Transaction_buyback`.
    pub fn metric_name(&self) -> String {
        match self {
            MarketEvent::AccountRegistered { .. } => "AccountRegistered".to_string(),
            MarketEvent::TransactionCompleted(record) => format!("Transaction_{}", record.kind),
        }
    }
}

/// Plain-text receipt for a settled transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionReport {
    pub account: AccountId,
    pub name: String,
    pub kind: TransactionKind,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

impl TransactionReport {
    pub fn new(record: &TransactionRecord, name: impl Into<String>) -> Self {
        Self {
            account: record.from.clone(),
            name: name.into(),
            kind: record.kind,
            amount: record.amount,
            created_at: record.timestamp,
        }
    }

    /// Archive key: `reports/{account}_{kind}_{YYYYmmdd_HHMMSS}.txt`.
    pub fn key(&self) -> String {
        format!(
            "reports/{}_{}_{}.txt",
            self.account,
            self.kind,
            self.created_at.format("%Y%m%d_%H%M%S")
        )
    }
}

impl fmt::Display for TransactionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Smart Energy Platform")?;
        writeln!(f, "User: {}", self.name)?;
        writeln!(f, "Transaction: {}", self.kind)?;
        writeln!(f, "Amount: {} kWh", self.amount)?;
        write!(f, "Date: {}", self.created_at.format("%Y-%m-%d %H:%M"))
    }
}

/// Receives events and reports after the fact. Failures never undo a trade.
pub trait Notifier {
    fn notify(&self, event: &MarketEvent) -> Result<(), NotifyError>;

    fn archive(&self, report: &TransactionReport) -> Result<(), NotifyError>;
}

/// Emits events and reports as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &MarketEvent) -> Result<(), NotifyError> {
        match event {
            MarketEvent::AccountRegistered { account } => {
                info!(metric = %event.metric_name(), account = %account, "event");
            }
            MarketEvent::TransactionCompleted(record) => {
                info!(
                    metric = %event.metric_name(),
                    tx = record.id,
                    account = %record.from,
                    amount = record.amount,
                    "event"
                );
            }
        }
        Ok(())
    }

    fn archive(&self, report: &TransactionReport) -> Result<(), NotifyError> {
        info!(key = %report.key(), "report archived");
        Ok(())
    }
}
