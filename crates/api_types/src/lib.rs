//! Wire types shared by the savings authority server and its clients.
//!
//! Field names are camelCase and amounts are JSON numbers in major units
//! with at most two decimals (`150.5`).

pub mod savings {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum TransactionKind {
        Deposit,
        Withdrawal,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionPayload {
        pub id: Uuid,
        pub user_id: String,
        #[serde(rename = "type")]
        pub kind: TransactionKind,
        pub amount: f64,
        pub timestamp: DateTime<Utc>,
        pub snapshot_before: f64,
        pub snapshot_after: f64,
        pub applied_version: u64,
        #[serde(default)]
        pub pending: bool,
    }

    /// Body of `POST /goals/{goal_id}/sync`.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SyncTransaction {
        pub goal_id: Uuid,
        pub transaction: TransactionPayload,
        /// Goal version the transaction was computed against.
        pub client_version: u64,
    }

    /// The authority's record of a goal.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RemoteGoalView {
        pub goal_id: Uuid,
        pub current_amount: f64,
        pub version: u64,
        pub updated_at: DateTime<Utc>,
    }

    /// Answer to a [`SyncTransaction`].
    ///
    /// `success = false` means the client is behind: `latest_goal` then
    /// carries the authority's current state.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SyncTransactionResponse {
        pub success: bool,
        pub new_version: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub latest_goal: Option<RemoteGoalView>,
    }
}

pub mod error {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ErrorResponse {
        pub error: String,
    }
}
