use clap::{Args, Parser, Subcommand};
use engine::{Currency, Money};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "nestegg")]
#[command(about = "Savings goals that stay usable offline")]
pub struct Cli {
    /// Optional config file path (TOML).
    #[arg(long)]
    pub config: Option<String>,
    /// Override the user id.
    #[arg(long)]
    pub user: Option<String>,
    /// Override the data directory.
    #[arg(long)]
    pub data_dir: Option<String>,
    /// Override the authority base URL (e.g. http://127.0.0.1:3000).
    #[arg(long)]
    pub remote_url: Option<String>,
    /// Override the log level.
    #[arg(long)]
    pub level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Goal(Goal),
    /// Add money to a goal.
    Deposit(TransactionArgs),
    /// Take money out of a goal.
    Withdraw(TransactionArgs),
    /// Run the savings authority over HTTP.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
pub struct Goal {
    #[command(subcommand)]
    pub command: GoalCommand,
}

#[derive(Subcommand, Debug)]
pub enum GoalCommand {
    Create(GoalCreateArgs),
    List,
    Show { id: Uuid },
}

#[derive(Args, Debug)]
pub struct GoalCreateArgs {
    pub name: String,
    pub target: Money,
    #[arg(long, default_value = "USD")]
    pub currency: Currency,
}

#[derive(Args, Debug)]
pub struct TransactionArgs {
    pub goal_id: Uuid,
    pub amount: Money,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
}
