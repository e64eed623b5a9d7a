//! Reference remote authority.
//!
//! [`AuthorityLedger`] is the server side of the version bookkeeping: one
//! record per goal, a version counter compared against the version claimed
//! by the client. [`LocalAuthority`] exposes it through [`RemoteAuthority`]
//! for in-process use and is what the HTTP server hosts.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    EngineError, KeyValueStore, RemoteAuthority, RemoteError, RemoteGoal, ResultEngine,
    SyncResponse, Transaction,
};

/// Key under which the authority keeps its records.
pub const AUTHORITY_KEY: &str = "server_savings_db";

#[derive(Debug)]
pub struct AuthorityLedger<S> {
    store: S,
    goals: HashMap<Uuid, RemoteGoal>,
}

impl<S: KeyValueStore> AuthorityLedger<S> {
    /// Opens the ledger persisted in `store`, empty if nothing was saved yet.
    pub fn open(store: S) -> ResultEngine<Self> {
        let goals = match store.get(AUTHORITY_KEY)? {
            Some(content) => serde_json::from_str(&content)?,
            None => HashMap::new(),
        };
        Ok(Self { store, goals })
    }

    pub fn record(&self, goal_id: Uuid) -> Option<&RemoteGoal> {
        self.goals.get(&goal_id)
    }

    /// Overwrites a record, as a concurrent writer would.
    pub fn insert(&mut self, record: RemoteGoal) -> ResultEngine<()> {
        self.goals.insert(record.goal_id, record);
        self.persist()
    }

    /// Checks `client_version` against the record and records the
    /// transaction when the client is not behind.
    ///
    /// A goal seen for the first time is initialized at the client's version
    /// and balance, so the first sync of a goal is always accepted. Nothing
    /// is recorded when the next version or the new balance is out of range.
    pub fn apply(
        &mut self,
        goal_id: Uuid,
        transaction: &Transaction,
        client_version: u64,
    ) -> ResultEngine<SyncResponse> {
        let record = match self.goals.get(&goal_id) {
            Some(record) => record.clone(),
            None => RemoteGoal {
                goal_id,
                current_amount: transaction.snapshot_before,
                version: client_version,
                updated_at: Utc::now(),
            },
        };

        if record.version > client_version {
            tracing::debug!(
                "rejecting {} on goal {goal_id}: remote v{} > client v{client_version}",
                transaction.id,
                record.version
            );
            return Ok(SyncResponse::Rejected {
                new_version: record.version,
                latest_goal: record,
            });
        }

        let new_version = client_version
            .checked_add(1)
            .ok_or(EngineError::InvalidVersion(client_version))?;
        let current_amount = record
            .current_amount
            .checked_add(transaction.delta())
            .ok_or_else(|| {
                EngineError::InvalidAmount(format!(
                    "goal {goal_id} balance would leave the supported range"
                ))
            })?;

        self.goals.insert(
            goal_id,
            RemoteGoal {
                goal_id,
                current_amount,
                version: new_version,
                updated_at: Utc::now(),
            },
        );
        self.persist()?;

        Ok(SyncResponse::Accepted { new_version })
    }

    fn persist(&self) -> ResultEngine<()> {
        let payload = serde_json::to_string(&self.goals)?;
        self.store.set(AUTHORITY_KEY, &payload)
    }
}

/// In-process [`RemoteAuthority`]. Clones share the same ledger.
///
/// [`LocalAuthority::set_reachable`] lets callers simulate a network outage.
#[derive(Debug)]
pub struct LocalAuthority<S> {
    ledger: Arc<Mutex<AuthorityLedger<S>>>,
    reachable: Arc<AtomicBool>,
}

impl<S> Clone for LocalAuthority<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            reachable: Arc::clone(&self.reachable),
        }
    }
}

impl<S: KeyValueStore> LocalAuthority<S> {
    pub fn open(store: S) -> ResultEngine<Self> {
        Ok(Self {
            ledger: Arc::new(Mutex::new(AuthorityLedger::open(store)?)),
            reachable: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    pub async fn record(&self, goal_id: Uuid) -> Option<RemoteGoal> {
        self.ledger.lock().await.record(goal_id).cloned()
    }

    pub async fn insert(&self, record: RemoteGoal) -> ResultEngine<()> {
        self.ledger.lock().await.insert(record)
    }

    /// [`AuthorityLedger::apply`] on the shared ledger, regardless of the
    /// offline switch.
    pub async fn apply(
        &self,
        goal_id: Uuid,
        transaction: &Transaction,
        client_version: u64,
    ) -> ResultEngine<SyncResponse> {
        self.ledger
            .lock()
            .await
            .apply(goal_id, transaction, client_version)
    }
}

impl<S: KeyValueStore> RemoteAuthority for LocalAuthority<S> {
    async fn sync_transaction(
        &self,
        goal_id: Uuid,
        transaction: &Transaction,
        client_version: u64,
    ) -> Result<SyncResponse, RemoteError> {
        if !self.is_reachable() {
            return Err(RemoteError::Unreachable("authority offline".to_string()));
        }
        self.apply(goal_id, transaction, client_version)
            .await
            .map_err(|err| RemoteError::Unreachable(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryKeyValueStore, Money, TransactionKind};

    fn deposit(cents: i64, before: i64, version: u64) -> Transaction {
        Transaction::new(
            "alice",
            TransactionKind::Deposit,
            Money::new(cents),
            Money::new(before),
            version,
        )
        .unwrap()
    }

    #[test]
    fn first_sync_initializes_and_accepts() {
        let mut ledger = AuthorityLedger::open(MemoryKeyValueStore::new()).unwrap();
        let goal_id = Uuid::new_v4();

        let res = ledger.apply(goal_id, &deposit(15_000, 0, 1), 1).unwrap();
        assert_eq!(res, SyncResponse::Accepted { new_version: 2 });

        let record = ledger.record(goal_id).unwrap();
        assert_eq!(record.version, 2);
        assert_eq!(record.current_amount, Money::new(15_000));
    }

    #[test]
    fn stale_client_is_rejected_with_latest_state() {
        let mut ledger = AuthorityLedger::open(MemoryKeyValueStore::new()).unwrap();
        let goal_id = Uuid::new_v4();
        ledger.apply(goal_id, &deposit(1_000, 0, 1), 1).unwrap();
        ledger.apply(goal_id, &deposit(1_000, 1_000, 2), 2).unwrap();

        let res = ledger.apply(goal_id, &deposit(500, 1_000, 2), 2).unwrap();
        let SyncResponse::Rejected {
            new_version,
            latest_goal,
        } = res
        else {
            panic!("expected rejection, got {res:?}");
        };
        assert_eq!(new_version, 3);
        assert_eq!(latest_goal.version, 3);
        assert_eq!(latest_goal.current_amount, Money::new(2_000));
    }

    #[test]
    fn equal_or_newer_client_version_is_accepted() {
        let mut ledger = AuthorityLedger::open(MemoryKeyValueStore::new()).unwrap();
        let goal_id = Uuid::new_v4();
        ledger.apply(goal_id, &deposit(1_000, 0, 1), 1).unwrap();

        let res = ledger.apply(goal_id, &deposit(1_000, 1_000, 5), 5).unwrap();
        assert_eq!(res, SyncResponse::Accepted { new_version: 6 });
    }

    #[test]
    fn ledger_survives_reopen() {
        let kv = MemoryKeyValueStore::new();
        let goal_id = Uuid::new_v4();
        {
            let mut ledger = AuthorityLedger::open(kv.clone()).unwrap();
            ledger.apply(goal_id, &deposit(1_000, 0, 1), 1).unwrap();
        }
        let ledger = AuthorityLedger::open(kv).unwrap();
        assert_eq!(ledger.record(goal_id).unwrap().version, 2);
    }

    #[test]
    fn exhausted_client_version_is_refused() {
        let mut ledger = AuthorityLedger::open(MemoryKeyValueStore::new()).unwrap();
        let goal_id = Uuid::new_v4();

        let err = ledger
            .apply(goal_id, &deposit(1_000, 0, u64::MAX), u64::MAX)
            .unwrap_err();
        assert_eq!(err, EngineError::InvalidVersion(u64::MAX));
        assert!(ledger.record(goal_id).is_none());
    }

    #[test]
    fn record_balance_is_bounded() {
        let mut ledger = AuthorityLedger::open(MemoryKeyValueStore::new()).unwrap();
        let goal_id = Uuid::new_v4();
        ledger
            .insert(RemoteGoal {
                goal_id,
                current_amount: Money::MAX,
                version: 2,
                updated_at: Utc::now(),
            })
            .unwrap();

        let err = ledger.apply(goal_id, &deposit(100, 0, 2), 2).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
        let record = ledger.record(goal_id).unwrap();
        assert_eq!(record.version, 2);
        assert_eq!(record.current_amount, Money::MAX);
    }

    #[tokio::test]
    async fn offline_switch_reports_unreachable() {
        let authority = LocalAuthority::open(MemoryKeyValueStore::new()).unwrap();
        authority.set_reachable(false);
        let err = authority
            .sync_transaction(Uuid::new_v4(), &deposit(1_000, 0, 1), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Unreachable(_)));
    }
}
