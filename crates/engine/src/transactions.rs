//! Ledger transactions.
//!
//! A `Transaction` moves money in or out of a single goal. Besides the
//! amount it records the goal balance right before and right after it was
//! applied, which is what makes an exact rollback possible.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
        }
    }

    /// Applies the sign carried by the kind to a non-negative amount.
    pub fn signed(self, amount: Money) -> Money {
        match self {
            Self::Deposit => amount,
            Self::Withdrawal => -amount,
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DEPOSIT" => Ok(Self::Deposit),
            "WITHDRAWAL" => Ok(Self::Withdrawal),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid transaction type: {other}"
            ))),
        }
    }
}

impl core::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Always non-negative, the direction is given by `kind`.
    pub amount: Money,
    pub timestamp: DateTime<Utc>,
    pub snapshot_before: Money,
    pub snapshot_after: Money,
    /// Goal version the transaction was computed against.
    pub applied_version: u64,
    /// Applied locally while the remote authority could not be reached.
    #[serde(default)]
    pub pending: bool,
}

impl Transaction {
    /// Builds a transaction on top of `snapshot_before`.
    ///
    /// `snapshot_after` is derived from the kind and the amount, so the pair
    /// is consistent by construction.
    pub fn new(
        user_id: &str,
        kind: TransactionKind,
        amount: Money,
        snapshot_before: Money,
        applied_version: u64,
    ) -> ResultEngine<Self> {
        if amount.is_negative() {
            return Err(EngineError::InvalidAmount(
                "amount must be >= 0, use the transaction type for the sign".to_string(),
            ));
        }
        let snapshot_after = snapshot_before
            .checked_add(kind.signed(amount))
            .ok_or_else(|| {
                EngineError::InvalidAmount(format!(
                    "balance would leave the supported range (max {})",
                    Money::MAX
                ))
            })?;

        Ok(Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            kind,
            amount,
            timestamp: Utc::now(),
            snapshot_before,
            snapshot_after,
            applied_version,
            pending: false,
        })
    }

    /// Signed effect of the transaction on the goal balance.
    pub fn delta(&self) -> Money {
        self.kind.signed(self.amount)
    }
}
