use engine::{
    FileKeyValueStore, Goal, LocalAuthority, SavingsManager, SyncOutcome, TransactionKind, User,
};
use crate::{
    cli::{GoalCommand, TransactionArgs},
    client::{Authority, HttpAuthority},
    error::{AppError, Result},
    settings::Settings,
};

type Manager = SavingsManager<FileKeyValueStore, Authority>;

fn open_manager(settings: &Settings) -> Result<Manager> {
    if settings.user.trim().is_empty() {
        return Err(AppError::Usage(
            "no user configured (use --user or NESTEGG_USER)".to_string(),
        ));
    }

    let remote = match &settings.remote_url {
        Some(url) => Authority::Http(HttpAuthority::new(url)?),
        None => Authority::Local(LocalAuthority::open(FileKeyValueStore::new(
            settings.authority_dir(),
        ))?),
    };
    let manager = SavingsManager::open(
        User::new(settings.user.trim()),
        FileKeyValueStore::new(settings.data_dir()),
        remote,
    )?;
    Ok(manager)
}

fn goal_line(goal: &Goal) -> String {
    let pending = goal.pending_transactions().count();
    let mut line = format!(
        "{}  {:<20} {} / {} {} ({:.1}%) v{}",
        goal.id,
        goal.name,
        goal.state.current_amount,
        goal.target.amount,
        goal.target.currency,
        goal.state.progress_percentage,
        goal.state.version
    );
    if pending > 0 {
        line.push_str(&format!("  [{pending} pending]"));
    }
    line
}

/// Message shown for each sync outcome.
pub fn describe_outcome(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Accepted { new_version, goal } => format!(
            "synced: {} is now {} {} (v{new_version})",
            goal.name, goal.state.current_amount, goal.target.currency
        ),
        SyncOutcome::Conflicted {
            remote_state,
            local_transaction,
        } => format!(
            "changes reverted: {} {} was computed on v{} but the goal is at v{} ({} on the server)",
            local_transaction.kind,
            local_transaction.amount,
            local_transaction.applied_version,
            remote_state.version,
            remote_state.current_amount
        ),
        SyncOutcome::Unreachable { goal, reason } => format!(
            "saved offline, will sync later: {} is now {} {} ({reason})",
            goal.name, goal.state.current_amount, goal.target.currency
        ),
    }
}

pub fn goal(settings: &Settings, command: GoalCommand) -> Result<()> {
    let mut manager = open_manager(settings)?;
    match command {
        GoalCommand::Create(args) => {
            let goal = manager.create_goal(&args.name, args.target.to_major(), args.currency)?;
            println!("created goal: {} ({})", goal.name, goal.id);
        }
        GoalCommand::List => {
            let goals = manager.get_all_goals();
            if goals.is_empty() {
                println!("no goals yet");
            }
            for goal in goals {
                println!("{}", goal_line(goal));
            }
        }
        GoalCommand::Show { id } => {
            let goal = manager
                .get_goal(id)
                .ok_or(engine::EngineError::GoalNotFound(id))?;
            println!("{}", serde_json::to_string_pretty(goal)?);
        }
    }
    Ok(())
}

pub async fn transaction(
    settings: &Settings,
    args: TransactionArgs,
    kind: TransactionKind,
) -> Result<()> {
    let mut manager = open_manager(settings)?;
    let outcome = manager
        .add_transaction(args.goal_id, args.amount.to_major(), kind)
        .await?;
    let message = describe_outcome(&outcome);
    if outcome.is_conflict() {
        eprintln!("{message}");
    } else {
        println!("{message}");
    }
    Ok(())
}

pub async fn serve(settings: &Settings) -> Result<()> {
    let authority = LocalAuthority::open(FileKeyValueStore::new(settings.authority_dir()))?;
    let addr = format!("{}:{}", settings.bind, settings.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(authority, listener).await?;
    Ok(())
}
