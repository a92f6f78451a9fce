//! Marketplace settings, read from an optional TOML file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::account::DEFAULT_CARBON_FACTOR;
use crate::marketplace::EnergyMarketplace;
use crate::model::TransactionKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Credits per kWh for each transaction kind.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    pub buyback: f64,
    pub loan: f64,
    pub purchase: f64,
    pub transfer: f64,
    /// Unset by default; lookups then fall back to 0.0.
    pub donation: Option<f64>,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            buyback: 0.15,
            loan: 0.10,
            purchase: 0.20,
            transfer: 0.05,
            donation: None,
        }
    }
}

impl RateConfig {
    pub fn entries(&self) -> Vec<(TransactionKind, f64)> {
        let mut entries = vec![
            (TransactionKind::Buyback, self.buyback),
            (TransactionKind::Loan, self.loan),
            (TransactionKind::Purchase, self.purchase),
            (TransactionKind::Transfer, self.transfer),
        ];
        if let Some(donation) = self.donation {
            entries.push((TransactionKind::Donation, donation));
        }
        entries
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub rates: RateConfig,
    /// kg CO2 per generated kWh, used in metrics snapshots
    pub carbon_factor: f64,
    /// How many records `recent_transactions` returns by default
    pub recent_limit: usize,
    /// Where to write settled transactions as csv, if anywhere
    pub ledger_path: Option<PathBuf>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            rates: RateConfig::default(),
            carbon_factor: DEFAULT_CARBON_FACTOR,
            recent_limit: 10,
            ledger_path: None,
        }
    }
}

impl MarketConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Self::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(data)?)
    }

    /// An empty marketplace using these rates.
    pub fn marketplace(&self) -> EnergyMarketplace {
        EnergyMarketplace::with_rates(self.rates.entries())
    }
}
