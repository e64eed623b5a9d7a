//! Savings goals kept in step with a remote authority.
//!
//! The [`SavingsManager`] applies every transaction locally first, persists
//! it, and only then asks the [`RemoteAuthority`] to accept it against the
//! goal version it was computed on. The three possible answers are surfaced
//! as [`SyncOutcome`] variants:
//!
//! - accepted: the goal adopts the version handed out by the authority;
//! - conflicted: the transaction is rolled back and the remote state returned;
//! - unreachable: the optimistic state stays and the transaction is flagged
//!   pending.
use std::collections::HashMap;

use uuid::Uuid;

pub use authority::{AUTHORITY_KEY, AuthorityLedger, LocalAuthority};
pub use currency::Currency;
pub use error::{EngineError, RemoteError};
pub use goal::{Goal, GoalState, GoalTarget};
pub use money::{Money, sanitize};
pub use remote::{RemoteAuthority, RemoteGoal, SyncResponse};
pub use store::{
    FileKeyValueStore, GoalStore, KeyValueStore, MemoryKeyValueStore, SCHEMA_VERSION,
    storage_key,
};
pub use transactions::{Transaction, TransactionKind};

mod authority;
mod currency;
mod error;
mod goal;
mod money;
mod remote;
mod store;
mod transactions;

pub type ResultEngine<T> = Result<T, EngineError>;

/// Identity every goal, transaction and storage key is scoped to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct User {
    pub id: String,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Result of a synchronization attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncOutcome {
    /// The authority recorded the transaction. `new_version` is the version
    /// the goal now carries.
    Accepted { new_version: u64, goal: Goal },
    /// The authority is ahead of us. The local transaction has been rolled
    /// back and is handed back together with the remote state, so the caller
    /// can retry or re-derive it.
    Conflicted {
        remote_state: RemoteGoal,
        local_transaction: Transaction,
    },
    /// The authority could not be reached. The transaction stays applied and
    /// is marked pending.
    Unreachable { goal: Goal, reason: String },
}

impl SyncOutcome {
    /// `true` unless the transaction was rolled back.
    pub fn is_success(&self) -> bool {
        !self.is_conflict()
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflicted { .. })
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }

    /// The goal after the attempt, when the transaction was kept.
    pub fn goal(&self) -> Option<&Goal> {
        match self {
            Self::Accepted { goal, .. } | Self::Unreachable { goal, .. } => Some(goal),
            Self::Conflicted { .. } => None,
        }
    }
}

/// A single item of [`SavingsManager::add_transactions`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransactionRequest {
    pub goal_id: Uuid,
    pub amount: f64,
    pub kind: TransactionKind,
}

/// Owner of the goals of one user.
///
/// Every mutation is persisted before the method returns or awaits the
/// remote authority. Mutating methods borrow the manager exclusively, so two
/// transactions on the same manager never interleave their optimistic
/// applies.
#[derive(Debug)]
pub struct SavingsManager<S, R> {
    user: User,
    store: GoalStore<S>,
    remote: R,
    goals: HashMap<Uuid, Goal>,
}

impl<S: KeyValueStore, R: RemoteAuthority> SavingsManager<S, R> {
    /// Builds the manager for `user` and loads the goals already stored.
    pub fn open(user: User, store: S, remote: R) -> ResultEngine<Self> {
        let store = GoalStore::new(store);
        let goals = store
            .load(&user.id)?
            .into_iter()
            .map(|goal| (goal.id, goal))
            .collect::<HashMap<_, _>>();
        tracing::debug!("loaded {} goals for user {}", goals.len(), user.id);

        Ok(Self {
            user,
            store,
            remote,
            goals,
        })
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// Creates a goal locally. The authority learns about it on the first
    /// synchronized transaction.
    pub fn create_goal(
        &mut self,
        name: &str,
        target_amount: f64,
        currency: Currency,
    ) -> ResultEngine<Goal> {
        let goal = Goal::new(name, Money::from_major(target_amount)?, currency)?;
        let id = goal.id;
        self.goals.insert(id, goal.clone());
        self.persist()?;
        tracing::debug!("created goal {id} ({name}) for user {}", self.user.id);
        Ok(goal)
    }

    pub fn get_goal(&self, id: Uuid) -> Option<&Goal> {
        self.goals.get(&id)
    }

    /// All goals, oldest first.
    pub fn get_all_goals(&self) -> Vec<&Goal> {
        let mut goals: Vec<&Goal> = self.goals.values().collect();
        goals.sort_by(|a, b| {
            a.target
                .created_at
                .cmp(&b.target.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        goals
    }

    /// Applies a transaction optimistically, then synchronizes it.
    ///
    /// Fails with [`EngineError::GoalNotFound`] or
    /// [`EngineError::InvalidAmount`] before touching anything. A storage
    /// failure is returned as [`EngineError::Persistence`] and leaves the
    /// in-memory goal as last applied.
    pub async fn add_transaction(
        &mut self,
        goal_id: Uuid,
        amount: f64,
        kind: TransactionKind,
    ) -> ResultEngine<SyncOutcome> {
        let transaction = {
            let goal = self
                .goals
                .get_mut(&goal_id)
                .ok_or(EngineError::GoalNotFound(goal_id))?;
            let amount = Money::from_major(amount)?;
            let transaction = Transaction::new(
                &self.user.id,
                kind,
                amount,
                goal.state.current_amount,
                goal.state.version,
            )?;
            goal.apply(transaction.clone());
            transaction
        };
        self.persist()?;
        tracing::debug!(
            "applied {} {} on goal {goal_id} at v{}",
            transaction.kind,
            transaction.amount,
            transaction.applied_version
        );

        let response = self
            .remote
            .sync_transaction(goal_id, &transaction, transaction.applied_version)
            .await;

        match response {
            Ok(SyncResponse::Accepted { new_version }) => {
                let goal = self.goal_mut(goal_id)?;
                if !goal.confirm(new_version) {
                    tracing::warn!(
                        "authority accepted {} on goal {goal_id} with non-increasing v{new_version}, keeping v{}",
                        transaction.id,
                        goal.state.version
                    );
                }
                self.persist()?;
                let goal = self.snapshot(goal_id)?;
                Ok(SyncOutcome::Accepted {
                    new_version: goal.state.version,
                    goal,
                })
            }
            Ok(SyncResponse::Rejected { latest_goal, .. }) => {
                self.rollback(goal_id)?;
                tracing::warn!(
                    "conflict on goal {goal_id}: local v{} behind remote v{}, rolled back {}",
                    transaction.applied_version,
                    latest_goal.version,
                    transaction.id
                );
                Ok(SyncOutcome::Conflicted {
                    remote_state: latest_goal,
                    local_transaction: transaction,
                })
            }
            Err(RemoteError::Unreachable(reason)) => {
                self.goal_mut(goal_id)?.mark_pending(transaction.id);
                self.persist()?;
                tracing::warn!("sync of {} failed, kept offline: {reason}", transaction.id);
                Ok(SyncOutcome::Unreachable {
                    goal: self.snapshot(goal_id)?,
                    reason,
                })
            }
        }
    }

    /// Synchronizes the requests one after the other.
    ///
    /// There is no atomicity across items: each result is independent and a
    /// failure does not stop the following requests.
    pub async fn add_transactions(
        &mut self,
        requests: impl IntoIterator<Item = TransactionRequest>,
    ) -> Vec<ResultEngine<SyncOutcome>> {
        let mut results = Vec::new();
        for request in requests {
            results.push(
                self.add_transaction(request.goal_id, request.amount, request.kind)
                    .await,
            );
        }
        results
    }

    /// Undoes the most recent transaction of a goal. Only used when the
    /// authority rejects it.
    fn rollback(&mut self, goal_id: Uuid) -> ResultEngine<Option<Transaction>> {
        let removed = self.goal_mut(goal_id)?.rollback_last();
        self.persist()?;
        Ok(removed)
    }

    fn goal_mut(&mut self, goal_id: Uuid) -> ResultEngine<&mut Goal> {
        self.goals
            .get_mut(&goal_id)
            .ok_or(EngineError::GoalNotFound(goal_id))
    }

    fn snapshot(&self, goal_id: Uuid) -> ResultEngine<Goal> {
        self.goals
            .get(&goal_id)
            .cloned()
            .ok_or(EngineError::GoalNotFound(goal_id))
    }

    fn persist(&self) -> ResultEngine<()> {
        self.store.save(&self.user.id, self.goals.values())
    }
}
