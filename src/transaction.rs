//! A single transfer of surplus energy between two accounts.
//!
//! Terms (amount, kind, rate and the resulting credits) are fixed when the
//! transaction is built. Later rate changes on the marketplace do not reach
//! an already built transaction.

use thiserror::Error;

use crate::account::EnergyAccount;
use crate::model::{AccountId, TransactionKind};

/// Hard failures: the caller built or used the transaction incorrectly.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("invalid transaction type '{0}'")]
    InvalidTransactionType(String),

    #[error("account {0} is not registered")]
    UnknownAccount(AccountId),

    #[error("account {0} cannot trade with itself")]
    SameAccount(AccountId),

    #[error("transaction already executed")]
    AlreadyExecuted,

    #[error("transaction source is account {expected}, got {found}")]
    AccountMismatch { expected: AccountId, found: AccountId },

    #[error("transaction recipient is {expected:?}, got {found:?}")]
    RecipientMismatch {
        expected: Option<AccountId>,
        found: Option<AccountId>,
    },
}

/// Business result of an execution attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Executed,
    /// Nothing was mutated.
    InsufficientSurplus { available: f64, requested: f64 },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Executed)
    }

    pub fn message(&self) -> &'static str {
        match self {
            Outcome::Executed => "Transaction successful",
            Outcome::InsufficientSurplus { .. } => "Insufficient surplus energy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionStatus {
    #[default]
    Pending,
    Executed,
}

#[derive(Debug, Clone)]
pub struct EnergyTransaction {
    from: AccountId,
    to: Option<AccountId>,
    amount: f64,
    kind: TransactionKind,
    rate: f64,
    credits_transferred: f64,
    status: TransactionStatus,
}

impl EnergyTransaction {
    /// Build a transaction from a type name, failing on unknown types.
    pub fn new(
        from: &EnergyAccount,
        to: Option<&EnergyAccount>,
        amount: f64,
        kind: &str,
        rate: f64,
    ) -> Result<Self, TransactionError> {
        let kind = kind.parse()?;
        Ok(Self::of_kind(from, to, amount, kind, rate))
    }

    pub fn of_kind(
        from: &EnergyAccount,
        to: Option<&EnergyAccount>,
        amount: f64,
        kind: TransactionKind,
        rate: f64,
    ) -> Self {
        Self {
            from: from.id().to_string(),
            to: to.map(|account| account.id().to_string()),
            amount,
            kind,
            rate,
            credits_transferred: amount * rate,
            status: TransactionStatus::Pending,
        }
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> Option<&str> {
        self.to.as_deref()
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn credits_transferred(&self) -> f64 {
        self.credits_transferred
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Execute the transfer on the accounts it was built for:
    /// - Check the source has at least `amount` of surplus
    /// - Book `amount` as consumed by the source and credit it `amount * rate`
    /// - Book `amount` as generated by the recipient, if any
    ///
    /// Credits are granted for every kind; donations rely on a zero rate.
    /// The check and the mutation are not atomic across callers, so access to
    /// both accounts must be serialized by whoever owns them.
    pub fn execute(
        &mut self,
        from: &mut EnergyAccount,
        to: Option<&mut EnergyAccount>,
    ) -> Result<Outcome, TransactionError> {
        if self.status == TransactionStatus::Executed {
            return Err(TransactionError::AlreadyExecuted);
        }
        self.check_participants(from, to.as_deref())?;

        let available = from.surplus();
        if available < self.amount {
            return Ok(Outcome::InsufficientSurplus {
                available,
                requested: self.amount,
            });
        }

        from.record_outflow(self.amount);
        from.add_credits(self.credits_transferred);

        if let Some(to) = to {
            to.record_inflow(self.amount);
        }

        self.status = TransactionStatus::Executed;
        Ok(Outcome::Executed)
    }

    fn check_participants(
        &self,
        from: &EnergyAccount,
        to: Option<&EnergyAccount>,
    ) -> Result<(), TransactionError> {
        if from.id() != self.from {
            return Err(TransactionError::AccountMismatch {
                expected: self.from.clone(),
                found: from.id().to_string(),
            });
        }
        let found = to.map(EnergyAccount::id);
        if found != self.to.as_deref() {
            return Err(TransactionError::RecipientMismatch {
                expected: self.to.clone(),
                found: found.map(str::to_string),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn account(id: &str, generated: f64, consumed: f64) -> EnergyAccount {
        EnergyAccount::with_balances(id, id, generated, consumed, 0.0)
    }

    // Construction

    #[test]
    fn invalid_type_fails_construction() {
        let a = account("A", 10.0, 0.0);
        let result = EnergyTransaction::new(&a, None, 1.0, "invalid", 0.1);
        assert!(matches!(
            result,
            Err(TransactionError::InvalidTransactionType(ref t)) if t == "invalid"
        ));
    }

    #[test]
    fn all_known_types_construct() {
        let a = account("A", 10.0, 0.0);
        for name in ["buyback", "loan", "donation", "purchase", "transfer"] {
            let tx = EnergyTransaction::new(&a, None, 1.0, name, 0.0).unwrap();
            assert_eq!(tx.kind().as_str(), name);
        }
    }

    #[test]
    fn credits_are_computed_at_construction() {
        let a = account("A", 10.0, 0.0);
        let tx = EnergyTransaction::new(&a, None, 20.0, "buyback", 0.15).unwrap();
        assert!(approx(tx.credits_transferred(), 3.0));
        assert_eq!(tx.status(), TransactionStatus::Pending);
    }

    // Execution

    #[test]
    fn buyback_books_consumption_and_credits() {
        let mut a = account("A", 100.0, 40.0);
        let mut tx = EnergyTransaction::new(&a, None, 20.0, "buyback", 0.15).unwrap();

        let outcome = tx.execute(&mut a, None).unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.message(), "Transaction successful");
        assert_eq!(a.consumed(), 60.0);
        assert!(approx(a.credits(), 3.0));
        assert_eq!(tx.status(), TransactionStatus::Executed);
    }

    #[test]
    fn loan_moves_energy_to_recipient() {
        let mut a = account("A", 100.0, 40.0);
        let mut b = account("B", 0.0, 30.0);
        let mut tx = EnergyTransaction::new(&a, Some(&b), 25.0, "loan", 0.10).unwrap();

        let outcome = tx.execute(&mut a, Some(&mut b)).unwrap();

        assert_eq!(outcome, Outcome::Executed);
        assert_eq!(a.consumed(), 65.0);
        assert!(approx(a.credits(), 2.5));
        assert_eq!(b.generated(), 25.0);
        assert_eq!(b.deficit(), 5.0);
    }

    #[test]
    fn donation_at_zero_rate_grants_nothing() {
        let mut a = account("A", 50.0, 0.0);
        let mut b = account("B", 0.0, 0.0);
        let mut tx = EnergyTransaction::new(&a, Some(&b), 50.0, "donation", 0.0).unwrap();

        tx.execute(&mut a, Some(&mut b)).unwrap();

        assert_eq!(a.credits(), 0.0);
        assert_eq!(a.surplus(), 0.0);
        assert_eq!(b.generated(), 50.0);
    }

    #[test]
    fn insufficient_surplus_mutates_nothing() {
        let mut a = account("A", 100.0, 90.0);
        let mut b = account("B", 0.0, 0.0);
        let mut tx = EnergyTransaction::new(&a, Some(&b), 15.0, "loan", 0.10).unwrap();

        let outcome = tx.execute(&mut a, Some(&mut b)).unwrap();

        assert!(!outcome.is_success());
        assert_eq!(outcome.message(), "Insufficient surplus energy");
        assert_eq!(
            outcome,
            Outcome::InsufficientSurplus {
                available: 10.0,
                requested: 15.0
            }
        );
        assert_eq!(a, account("A", 100.0, 90.0));
        assert_eq!(b, account("B", 0.0, 0.0));
        assert_eq!(tx.status(), TransactionStatus::Pending);
    }

    #[test]
    fn exact_surplus_is_enough() {
        let mut a = account("A", 30.0, 10.0);
        let mut tx = EnergyTransaction::new(&a, None, 20.0, "buyback", 0.0).unwrap();
        assert!(tx.execute(&mut a, None).unwrap().is_success());
        assert_eq!(a.surplus(), 0.0);
    }

    #[test]
    fn second_execution_fails() {
        let mut a = account("A", 100.0, 0.0);
        let mut tx = EnergyTransaction::new(&a, None, 10.0, "buyback", 0.15).unwrap();
        tx.execute(&mut a, None).unwrap();

        let result = tx.execute(&mut a, None);
        assert!(matches!(result, Err(TransactionError::AlreadyExecuted)));
        assert_eq!(a.consumed(), 10.0);
    }

    #[test]
    fn rejected_transaction_can_be_retried() {
        let mut a = account("A", 10.0, 0.0);
        let mut tx = EnergyTransaction::new(&a, None, 15.0, "buyback", 0.0).unwrap();
        assert!(!tx.execute(&mut a, None).unwrap().is_success());

        a.update_energy(Some(20.0), None);
        assert!(tx.execute(&mut a, None).unwrap().is_success());
    }

    #[test]
    fn wrong_source_account_fails() {
        let a = account("A", 100.0, 0.0);
        let mut other = account("X", 100.0, 0.0);
        let mut tx = EnergyTransaction::new(&a, None, 10.0, "buyback", 0.15).unwrap();

        let result = tx.execute(&mut other, None);
        assert!(matches!(result, Err(TransactionError::AccountMismatch { .. })));
        assert_eq!(other.consumed(), 0.0);
    }

    #[test]
    fn missing_recipient_fails() {
        let mut a = account("A", 100.0, 0.0);
        let b = account("B", 0.0, 0.0);
        let mut tx = EnergyTransaction::new(&a, Some(&b), 10.0, "loan", 0.1).unwrap();

        let result = tx.execute(&mut a, None);
        assert!(matches!(result, Err(TransactionError::RecipientMismatch { .. })));
        assert_eq!(a.consumed(), 0.0);
    }
}
