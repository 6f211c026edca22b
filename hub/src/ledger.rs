//! Donation goal ledger.
//!
//! Tracks the goal and the accumulated value. Progress is the whole percentage
//! of the goal reached, rounded down and capped at 100.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{amount_number, DonationPayload};

/// Errors from ledger updates.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("donation amount must be a finite, non-negative number, got {0}")]
    InvalidAmount(f64),

    #[error("goal must be a finite number greater than 0, got {0}")]
    InvalidGoal(f64),
}

/// Goal and accumulated donations.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    goal: f64,
    value: f64,
}

/// Point-in-time view of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub value: f64,
    pub goal: f64,
    pub progress: u64,
}

impl Ledger {
    /// Creates a ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidGoal`] unless `goal > 0`, and
    /// [`LedgerError::InvalidAmount`] if `value` is negative or not finite.
    pub fn new(goal: f64, value: f64) -> Result<Self, LedgerError> {
        check_goal(goal)?;
        check_amount(value)?;
        Ok(Self { goal, value })
    }

    #[must_use]
    pub fn goal(&self) -> f64 {
        self.goal
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// `floor(value / goal * 100)`, capped at 100.
    #[must_use]
    pub fn progress(&self) -> u64 {
        let percent = (self.value / self.goal * 100.0).floor();
        percent.clamp(0.0, 100.0) as u64
    }

    /// Adds a donation.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidAmount`] for negative or non-finite
    /// amounts; the ledger is unchanged.
    pub fn record(&mut self, amount: f64) -> Result<LedgerSnapshot, LedgerError> {
        check_amount(amount)?;
        let value = self.value + amount;
        check_amount(value)?;
        self.value = value;
        Ok(self.snapshot())
    }

    /// Replaces the goal.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidGoal`] unless `goal > 0`.
    pub fn set_goal(&mut self, goal: f64) -> Result<LedgerSnapshot, LedgerError> {
        check_goal(goal)?;
        self.goal = goal;
        Ok(self.snapshot())
    }

    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            value: self.value,
            goal: self.goal,
            progress: self.progress(),
        }
    }
}

impl LedgerSnapshot {
    /// Builds the donation payload subscribers receive.
    #[must_use]
    pub fn to_payload(&self, quiet: bool) -> DonationPayload {
        DonationPayload {
            value: amount_number(self.value),
            goal: amount_number(self.goal),
            progress: self.progress,
            quiet: Some(quiet),
        }
    }
}

fn check_goal(goal: f64) -> Result<(), LedgerError> {
    if goal.is_finite() && goal > 0.0 {
        Ok(())
    } else {
        Err(LedgerError::InvalidGoal(goal))
    }
}

fn check_amount(amount: f64) -> Result<(), LedgerError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_rounds_down() {
        let ledger = Ledger::new(3.0, 2.0).unwrap();
        assert_eq!(ledger.progress(), 66);
    }

    #[test]
    fn progress_caps_at_100() {
        let ledger = Ledger::new(100.0, 250.0).unwrap();
        assert_eq!(ledger.progress(), 100);
    }

    #[test]
    fn record_accumulates() {
        let mut ledger = Ledger::new(100.0, 0.0).unwrap();
        ledger.record(10.0).unwrap();
        let snapshot = ledger.record(15.5).unwrap();

        assert_eq!(snapshot.value, 25.5);
        assert_eq!(snapshot.progress, 25);
    }

    #[test]
    fn record_rejects_bad_amounts_without_changing_state() {
        let mut ledger = Ledger::new(100.0, 5.0).unwrap();

        assert_eq!(ledger.record(-1.0), Err(LedgerError::InvalidAmount(-1.0)));
        assert!(ledger.record(f64::NAN).is_err());
        assert!(ledger.record(f64::INFINITY).is_err());
        assert_eq!(ledger.value(), 5.0);
    }

    #[test]
    fn goal_must_be_positive() {
        assert_eq!(Ledger::new(0.0, 0.0), Err(LedgerError::InvalidGoal(0.0)));
        assert!(Ledger::new(-10.0, 0.0).is_err());

        let mut ledger = Ledger::new(100.0, 50.0).unwrap();
        assert!(ledger.set_goal(0.0).is_err());
        assert_eq!(ledger.goal(), 100.0);
    }

    #[test]
    fn set_goal_recomputes_progress() {
        let mut ledger = Ledger::new(100.0, 50.0).unwrap();
        let snapshot = ledger.set_goal(200.0).unwrap();
        assert_eq!(snapshot.progress, 25);
    }

    #[test]
    fn snapshot_payload_uses_integer_numbers() {
        let ledger = Ledger::new(100.0, 40.0).unwrap();
        let payload = ledger.snapshot().to_payload(false);

        assert_eq!(payload.value.to_string(), "40");
        assert_eq!(payload.goal.to_string(), "100");
        assert_eq!(payload.progress, 40);
        assert_eq!(payload.quiet, Some(false));
    }
}
