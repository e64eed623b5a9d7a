//! Savings goals.
//!
//! A [`Goal`] owns its ledger. The `state` block is only ever changed through
//! the crate-private methods below, which keep `progress_percentage` in step
//! with `current_amount` after every mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, ResultEngine, Transaction};

/// What the goal is saving towards. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalTarget {
    pub amount: Money,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalState {
    pub current_amount: Money,
    /// `current_amount / target.amount * 100`, clamped to `[0, 100]`.
    pub progress_percentage: f64,
    /// Optimistic lock: starts at 1, advanced only by remote acceptance.
    pub version: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "targetDetails")]
    pub target: GoalTarget,
    pub state: GoalState,
    #[serde(default)]
    pub ledger: Vec<Transaction>,
}

impl Goal {
    pub const INITIAL_VERSION: u64 = 1;

    pub fn new(name: &str, target_amount: Money, currency: Currency) -> ResultEngine<Self> {
        if !target_amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "invalid target for goal '{name}': target must be > 0"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            target: GoalTarget {
                amount: target_amount,
                currency,
                created_at: Utc::now(),
            },
            state: GoalState {
                current_amount: Money::ZERO,
                progress_percentage: 0.0,
                version: Self::INITIAL_VERSION,
            },
            ledger: Vec::new(),
        })
    }

    /// Ledger entries applied while offline and never confirmed.
    pub fn pending_transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.ledger.iter().filter(|tx| tx.pending)
    }

    /// Signed sum of the ledger, in ledger order.
    pub fn ledger_balance(&self) -> Money {
        self.ledger
            .iter()
            .fold(Money::ZERO, |acc, tx| acc + tx.delta())
    }

    pub fn last_transaction(&self) -> Option<&Transaction> {
        self.ledger.last()
    }

    /// Appends `transaction` and moves the balance to its `snapshot_after`.
    pub(crate) fn apply(&mut self, transaction: Transaction) {
        self.state.current_amount = transaction.snapshot_after;
        self.ledger.push(transaction);
        self.refresh_progress();
    }

    /// Removes the most recent transaction and restores its
    /// `snapshot_before`. Nothing happens on an empty ledger.
    pub(crate) fn rollback_last(&mut self) -> Option<Transaction> {
        let transaction = self.ledger.pop()?;
        self.state.current_amount = transaction.snapshot_before;
        self.refresh_progress();
        Some(transaction)
    }

    /// Adopts the version handed out by the remote authority.
    ///
    /// Returns `false` when `version` would not move the goal forward; the
    /// local version is kept in that case.
    pub(crate) fn confirm(&mut self, version: u64) -> bool {
        if version <= self.state.version {
            return false;
        }
        self.state.version = version;
        true
    }

    pub(crate) fn mark_pending(&mut self, transaction_id: Uuid) -> bool {
        match self.ledger.iter_mut().rev().find(|tx| tx.id == transaction_id) {
            Some(tx) => {
                tx.pending = true;
                true
            }
            None => false,
        }
    }

    fn refresh_progress(&mut self) {
        self.state.progress_percentage = self.state.current_amount.percent_of(self.target.amount);
    }
}
