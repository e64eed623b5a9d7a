//! The module contains the errors the engine can return.
//!
//! A rejected or unreachable synchronization is **not** an error: both are
//! reported through [`SyncOutcome`] so callers can tell "changes reverted"
//! apart from "saved offline". Only failures that stop an operation before
//! it has any effect, or a broken storage medium, end up here.
//!
//!  [`SyncOutcome`]: super::SyncOutcome
use thiserror::Error;
use uuid::Uuid;

/// Engine custom errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("goal \"{0}\" not found")]
    GoalNotFound(Uuid),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Unsupported currency: {0}")]
    InvalidCurrency(String),
    #[error("version {0} cannot be advanced")]
    InvalidVersion(u64),
    #[error("local storage failure: {0}")]
    Persistence(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(value: serde_json::Error) -> Self {
        Self::Persistence(value.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(value: std::io::Error) -> Self {
        Self::Persistence(value.to_string())
    }
}

/// Failure to obtain an answer from the remote authority.
///
/// The engine treats it as the offline outcome, never as a rejection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote authority unreachable: {0}")]
    Unreachable(String),
}
