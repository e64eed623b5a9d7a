use api_types::{
    error::ErrorResponse,
    savings::{
        RemoteGoalView, SyncTransaction, SyncTransactionResponse, TransactionKind as ApiKind,
        TransactionPayload,
    },
};
use chrono::Utc;
use engine::{
    FileKeyValueStore, LocalAuthority, Money, RemoteAuthority, RemoteError, RemoteGoal,
    SyncResponse, Transaction, TransactionKind,
};
use reqwest::Url;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Savings authority reached over HTTP.
///
/// Anything short of a decoded answer (transport failure, non-2xx status,
/// unreadable body) is reported as [`RemoteError::Unreachable`].
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpAuthority {
    /// `base_url` may carry a path prefix (`http://host/api`); endpoints are
    /// resolved below it whether or not it ends with `/`.
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|err| AppError::Usage(format!("invalid remote_url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Usage(format!(
                "invalid remote_url: {base_url} cannot be a base"
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    fn sync_endpoint(&self, goal_id: Uuid) -> std::result::Result<Url, RemoteError> {
        self.base_url
            .join(&format!("goals/{goal_id}/sync"))
            .map_err(|err| RemoteError::Unreachable(format!("invalid remote_url: {err}")))
    }
}

impl RemoteAuthority for HttpAuthority {
    async fn sync_transaction(
        &self,
        goal_id: Uuid,
        transaction: &Transaction,
        client_version: u64,
    ) -> std::result::Result<SyncResponse, RemoteError> {
        let endpoint = self.sync_endpoint(goal_id)?;

        let payload = SyncTransaction {
            goal_id,
            transaction: payload_from_transaction(transaction),
            client_version,
        };

        let res = self
            .http
            .post(endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|err| RemoteError::Unreachable(err.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res
                .json::<ErrorResponse>()
                .await
                .map(|err| err.error)
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(RemoteError::Unreachable(format!("{status}: {body}")));
        }

        let body = res
            .json::<SyncTransactionResponse>()
            .await
            .map_err(|err| RemoteError::Unreachable(format!("malformed response: {err}")))?;
        sync_response_from_view(goal_id, transaction, body)
    }
}

/// Authority picked from the settings.
#[derive(Debug, Clone)]
pub enum Authority {
    Http(HttpAuthority),
    Local(LocalAuthority<FileKeyValueStore>),
}

impl RemoteAuthority for Authority {
    async fn sync_transaction(
        &self,
        goal_id: Uuid,
        transaction: &Transaction,
        client_version: u64,
    ) -> std::result::Result<SyncResponse, RemoteError> {
        match self {
            Self::Http(remote) => {
                remote
                    .sync_transaction(goal_id, transaction, client_version)
                    .await
            }
            Self::Local(remote) => {
                remote
                    .sync_transaction(goal_id, transaction, client_version)
                    .await
            }
        }
    }
}

fn map_kind(kind: TransactionKind) -> ApiKind {
    match kind {
        TransactionKind::Deposit => ApiKind::Deposit,
        TransactionKind::Withdrawal => ApiKind::Withdrawal,
    }
}

fn payload_from_transaction(tx: &Transaction) -> TransactionPayload {
    TransactionPayload {
        id: tx.id,
        user_id: tx.user_id.clone(),
        kind: map_kind(tx.kind),
        amount: tx.amount.to_major(),
        timestamp: tx.timestamp,
        snapshot_before: tx.snapshot_before.to_major(),
        snapshot_after: tx.snapshot_after.to_major(),
        applied_version: tx.applied_version,
        pending: tx.pending,
    }
}

fn remote_goal_from_view(view: RemoteGoalView) -> std::result::Result<RemoteGoal, RemoteError> {
    let current_amount = Money::from_major(view.current_amount)
        .map_err(|err| RemoteError::Unreachable(format!("malformed response: {err}")))?;
    Ok(RemoteGoal {
        goal_id: view.goal_id,
        current_amount,
        version: view.version,
        updated_at: view.updated_at,
    })
}

/// A rejection without `latestGoal` still counts as a conflict; the remote
/// state is then rebuilt from the rejected version and our own snapshot.
fn sync_response_from_view(
    goal_id: Uuid,
    transaction: &Transaction,
    view: SyncTransactionResponse,
) -> std::result::Result<SyncResponse, RemoteError> {
    if view.success {
        return Ok(SyncResponse::Accepted {
            new_version: view.new_version,
        });
    }

    let latest_goal = match view.latest_goal {
        Some(latest) => remote_goal_from_view(latest)?,
        None => RemoteGoal {
            goal_id,
            current_amount: transaction.snapshot_before,
            version: view.new_version,
            updated_at: Utc::now(),
        },
    };
    Ok(SyncResponse::Rejected {
        new_version: view.new_version,
        latest_goal,
    })
}

#[cfg(test)]
mod tests {
    use engine::{MemoryKeyValueStore, SavingsManager, SyncOutcome, User};

    use super::*;

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
    fn payload_uses_major_units() {
        let tx = deposit(15_050, 1_000, 3);
        let payload = payload_from_transaction(&tx);
        assert_eq!(payload.id, tx.id);
        assert_eq!(payload.kind, ApiKind::Deposit);
        assert_eq!(payload.amount, 150.5);
        assert_eq!(payload.snapshot_before, 10.0);
        assert_eq!(payload.snapshot_after, 160.5);
        assert_eq!(payload.applied_version, 3);
    }

    #[test]
    fn success_maps_to_accepted() {
        let tx = deposit(100, 0, 1);
        let view = SyncTransactionResponse {
            success: true,
            new_version: 2,
            latest_goal: None,
        };
        assert_eq!(
            sync_response_from_view(Uuid::new_v4(), &tx, view).unwrap(),
            SyncResponse::Accepted { new_version: 2 }
        );
    }

    #[test]
    fn rejection_carries_latest_goal() {
        let goal_id = Uuid::new_v4();
        let tx = deposit(100, 0, 3);
        let view = SyncTransactionResponse {
            success: false,
            new_version: 4,
            latest_goal: Some(RemoteGoalView {
                goal_id,
                current_amount: 300.25,
                version: 4,
                updated_at: Utc::now(),
            }),
        };
        let SyncResponse::Rejected { latest_goal, .. } =
            sync_response_from_view(goal_id, &tx, view).unwrap()
        else {
            panic!("expected rejection");
        };
        assert_eq!(latest_goal.current_amount, Money::new(30_025));
        assert_eq!(latest_goal.version, 4);
    }

    #[test]
    fn bare_rejection_is_still_a_conflict() {
        let goal_id = Uuid::new_v4();
        let tx = deposit(100, 700, 3);
        let view = SyncTransactionResponse {
            success: false,
            new_version: 5,
            latest_goal: None,
        };
        let SyncResponse::Rejected { latest_goal, .. } =
            sync_response_from_view(goal_id, &tx, view).unwrap()
        else {
            panic!("expected rejection");
        };
        assert_eq!(latest_goal.goal_id, goal_id);
        assert_eq!(latest_goal.version, 5);
        assert_eq!(latest_goal.current_amount, Money::new(700));
    }

    #[tokio::test]
    async fn manager_syncs_through_http_server() {
        let authority = LocalAuthority::open(MemoryKeyValueStore::new()).unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = server::spawn_with_listener(authority.clone(), listener).unwrap();

        let remote = HttpAuthority::new(&format!("http://{addr}")).unwrap();
        let mut manager =
            SavingsManager::open(User::new("alice"), MemoryKeyValueStore::new(), remote).unwrap();
        let goal = manager
            .create_goal("Laptop", 500.0, engine::Currency::Usd)
            .unwrap();

        let outcome = manager
            .add_transaction(goal.id, 150.0, TransactionKind::Deposit)
            .await
            .unwrap();
        assert!(matches!(outcome, SyncOutcome::Accepted { new_version: 2, .. }));
        assert_eq!(authority.record(goal.id).await.unwrap().version, 2);

        authority
            .insert(RemoteGoal {
                goal_id: goal.id,
                current_amount: Money::new(9_900),
                version: 9,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
        let outcome = manager
            .add_transaction(goal.id, 10.0, TransactionKind::Deposit)
            .await
            .unwrap();
        let SyncOutcome::Conflicted { remote_state, .. } = outcome else {
            panic!("expected conflict, got {outcome:?}");
        };
        assert_eq!(remote_state.version, 9);
        assert_eq!(
            manager.get_goal(goal.id).unwrap().state.current_amount,
            Money::new(15_000)
        );
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let remote = HttpAuthority::new(&format!("http://{addr}")).unwrap();
        let err = remote
            .sync_transaction(Uuid::new_v4(), &deposit(100, 0, 1), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Unreachable(_)));
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let goal_id = Uuid::new_v4();
        let expected = format!("http://host/api/goals/{goal_id}/sync");

        for base in ["http://host/api", "http://host/api/"] {
            let remote = HttpAuthority::new(base).unwrap();
            assert_eq!(remote.sync_endpoint(goal_id).unwrap().as_str(), expected);
        }

        let remote = HttpAuthority::new("http://host:3000").unwrap();
        assert_eq!(
            remote.sync_endpoint(goal_id).unwrap().as_str(),
            format!("http://host:3000/goals/{goal_id}/sync")
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpAuthority::new("not a url"),
            Err(AppError::Usage(_))
        ));
    }
}
