//! Remote authority endpoints

use api_types::savings::{
    RemoteGoalView, SyncTransaction, SyncTransactionResponse, TransactionKind as ApiKind,
    TransactionPayload,
};
use axum::{
    Json,
    extract::{Path, State},
};
use engine::{
    EngineError, KeyValueStore, Money, RemoteError, RemoteGoal, SyncResponse, Transaction,
    TransactionKind,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_kind(kind: ApiKind) -> TransactionKind {
    match kind {
        ApiKind::Deposit => TransactionKind::Deposit,
        ApiKind::Withdrawal => TransactionKind::Withdrawal,
    }
}

fn transaction_from_payload(payload: TransactionPayload) -> Result<Transaction, EngineError> {
    let amount = Money::from_major(payload.amount)?;
    if amount.is_negative() {
        return Err(EngineError::InvalidAmount("amount must be >= 0".to_string()));
    }
    Ok(Transaction {
        id: payload.id,
        user_id: payload.user_id,
        kind: map_kind(payload.kind),
        amount,
        timestamp: payload.timestamp,
        snapshot_before: Money::from_major(payload.snapshot_before)?,
        snapshot_after: Money::from_major(payload.snapshot_after)?,
        applied_version: payload.applied_version,
        pending: payload.pending,
    })
}

fn remote_goal_view(goal: &RemoteGoal) -> RemoteGoalView {
    RemoteGoalView {
        goal_id: goal.goal_id,
        current_amount: goal.current_amount.to_major(),
        version: goal.version,
        updated_at: goal.updated_at,
    }
}

fn sync_response_view(response: SyncResponse) -> SyncTransactionResponse {
    match response {
        SyncResponse::Accepted { new_version } => SyncTransactionResponse {
            success: true,
            new_version,
            latest_goal: None,
        },
        SyncResponse::Rejected {
            new_version,
            latest_goal,
        } => SyncTransactionResponse {
            success: false,
            new_version,
            latest_goal: Some(remote_goal_view(&latest_goal)),
        },
    }
}

pub async fn sync<S: KeyValueStore + 'static>(
    State(state): State<ServerState<S>>,
    Path(goal_id): Path<Uuid>,
    Json(payload): Json<SyncTransaction>,
) -> Result<Json<SyncTransactionResponse>, ServerError> {
    if payload.goal_id != goal_id {
        return Err(ServerError::Generic(format!(
            "goal id mismatch: path {goal_id}, body {}",
            payload.goal_id
        )));
    }

    if !state.authority.is_reachable() {
        return Err(RemoteError::Unreachable("authority offline".to_string()).into());
    }

    let transaction = transaction_from_payload(payload.transaction)?;
    let response = state
        .authority
        .apply(goal_id, &transaction, payload.client_version)
        .await?;

    match &response {
        SyncResponse::Accepted { new_version } => {
            tracing::info!("goal {goal_id}: accepted {} -> v{new_version}", transaction.id)
        }
        SyncResponse::Rejected { new_version, .. } => tracing::info!(
            "goal {goal_id}: rejected {} (client v{}, remote v{new_version})",
            transaction.id,
            payload.client_version
        ),
    }

    Ok(Json(sync_response_view(response)))
}

pub async fn get<S: KeyValueStore + 'static>(
    State(state): State<ServerState<S>>,
    Path(goal_id): Path<Uuid>,
) -> Result<Json<RemoteGoalView>, ServerError> {
    let record = state
        .authority
        .record(goal_id)
        .await
        .ok_or(EngineError::GoalNotFound(goal_id))?;
    Ok(Json(remote_goal_view(&record)))
}
