//! Contract of the remote authority consulted after every optimistic apply.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Money, RemoteError, Transaction};

/// The authority's own view of a goal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteGoal {
    pub goal_id: Uuid,
    pub current_amount: Money,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// Answer of a reachable authority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncResponse {
    /// The transaction was recorded and the goal moved to `new_version`.
    Accepted { new_version: u64 },
    /// Another writer got there first; `latest_goal` is the authority's
    /// current state.
    Rejected {
        new_version: u64,
        latest_goal: RemoteGoal,
    },
}

/// Backend collaborator of the savings engine.
///
/// An `Err` means the call could not complete at all (network down, server
/// failing) and is handled as the offline case. A reachable authority
/// always answers with a [`SyncResponse`].
pub trait RemoteAuthority: Send + Sync {
    fn sync_transaction(
        &self,
        goal_id: Uuid,
        transaction: &Transaction,
        client_version: u64,
    ) -> impl Future<Output = Result<SyncResponse, RemoteError>> + Send;
}
