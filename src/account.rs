use crate::model::AccountId;

/// kg CO2 avoided per generated kWh when no factor is configured.
pub const DEFAULT_CARBON_FACTOR: f64 = 0.5;

/// One participant's energy ledger.
///
/// `generated` and `consumed` are cumulative kWh. `credits` only goes down
/// through [`EnergyAccount::deduct_credits`], which refuses to overdraw.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyAccount {
    id: AccountId,
    name: String,
    generated: f64,
    consumed: f64,
    credits: f64,
}

/// Point-in-time view of an account and its derived values.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountMetrics {
    pub account: AccountId,
    pub name: String,
    pub generated: f64,
    pub consumed: f64,
    pub credits: f64,
    pub surplus: f64,
    pub deficit: f64,
    pub efficiency: f64,
    pub self_sufficiency: f64,
    pub carbon_offset: f64,
}

impl EnergyAccount {
    pub fn new(id: impl Into<AccountId>, name: impl Into<String>) -> Self {
        Self::with_balances(id, name, 0.0, 0.0, 0.0)
    }

    pub fn with_balances(
        id: impl Into<AccountId>,
        name: impl Into<String>,
        generated: f64,
        consumed: f64,
        credits: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            generated,
            consumed,
            credits,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn generated(&self) -> f64 {
        self.generated
    }

    pub fn consumed(&self) -> f64 {
        self.consumed
    }

    pub fn credits(&self) -> f64 {
        self.credits
    }

    /// kWh available to trade.
    pub fn surplus(&self) -> f64 {
        (self.generated - self.consumed).max(0.0)
    }

    /// kWh shortfall.
    pub fn deficit(&self) -> f64 {
        (self.consumed - self.generated).max(0.0)
    }

    /// Generation as a percentage of consumption. Not capped.
    pub fn efficiency(&self) -> f64 {
        if self.consumed == 0.0 {
            return 100.0;
        }
        self.generated / self.consumed * 100.0
    }

    /// Like [`efficiency`](Self::efficiency), capped at 100.
    pub fn self_sufficiency(&self) -> f64 {
        self.efficiency().min(100.0)
    }

    pub fn carbon_offset(&self, carbon_factor: f64) -> f64 {
        self.generated * carbon_factor
    }

    /// Overwrite whichever reading is given. Values are not range checked.
    pub fn update_energy(&mut self, generated: Option<f64>, consumed: Option<f64>) {
        if let Some(generated) = generated {
            self.generated = generated;
        }
        if let Some(consumed) = consumed {
            self.consumed = consumed;
        }
    }

    /// Unconditional; a negative amount lowers the balance.
    pub fn add_credits(&mut self, amount: f64) {
        self.credits += amount;
    }

    /// Returns `false` and leaves the balance untouched when it would overdraw.
    pub fn deduct_credits(&mut self, amount: f64) -> bool {
        if self.credits >= amount {
            self.credits -= amount;
            true
        } else {
            false
        }
    }

    pub fn metrics(&self) -> AccountMetrics {
        self.metrics_with(DEFAULT_CARBON_FACTOR)
    }

    pub fn metrics_with(&self, carbon_factor: f64) -> AccountMetrics {
        AccountMetrics {
            account: self.id.clone(),
            name: self.name.clone(),
            generated: self.generated,
            consumed: self.consumed,
            credits: self.credits,
            surplus: self.surplus(),
            deficit: self.deficit(),
            efficiency: self.efficiency(),
            self_sufficiency: self.self_sufficiency(),
            carbon_offset: self.carbon_offset(carbon_factor),
        }
    }

    /// Sold, loaned or donated energy is booked as consumed by the source.
    pub(crate) fn record_outflow(&mut self, amount: f64) {
        self.consumed += amount;
    }

    /// Received energy is booked as generated by the destination.
    pub(crate) fn record_inflow(&mut self, amount: f64) {
        self.generated += amount;
    }
}
