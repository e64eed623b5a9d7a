use clap::Parser;
use engine::TransactionKind;

mod cli;
mod client;
mod commands;
mod error;
mod settings;

use crate::{
    cli::{Cli, Command},
    error::Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = settings::load(&cli)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "nestegg={level},server={level},engine={level}",
            level = settings.level
        ))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Goal(goal) => commands::goal(&settings, goal.command),
        Command::Deposit(args) => {
            commands::transaction(&settings, args, TransactionKind::Deposit).await
        }
        Command::Withdraw(args) => {
            commands::transaction(&settings, args, TransactionKind::Withdrawal).await
        }
        Command::Serve(args) => {
            let mut settings = settings;
            if let Some(bind) = args.bind {
                settings.bind = bind;
            }
            if let Some(port) = args.port {
                settings.port = port;
            }
            tracing::info!("starting savings authority...");
            commands::serve(&settings).await
        }
    }
}
