//! Atrium CLI - Operate the shared-state employee console from the terminal
//!
//! Every invocation is its own console instance: it rendezvouses on the
//! shared folder (or falls back to app-data storage), performs one
//! operation, and exits. `atrium watch` stays resident and polls for
//! remote changes.

mod cli;
mod commands;
mod error;

use clap::{CommandFactory, Parser};

use crate::cli::{AlertCommands, Cli, Commands, OrgCommands, RecordCommands, RoomCommands};
use crate::commands::common::resolve_config;
use crate::commands::{alerts, completions, org, records, rooms, status, sync, watch};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("atrium=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.shared_root, cli.poll_interval);

    match cli.command {
        Some(Commands::Status { json }) => status::run_status(json, &config).await?,
        Some(Commands::Sync) => sync::run_sync(&config).await?,
        Some(Commands::Watch) => watch::run_watch(&config).await?,
        Some(Commands::Rooms { command }) => match command {
            RoomCommands::List { json } => rooms::run_list(json, &config).await?,
            RoomCommands::Init => rooms::run_init(&config).await?,
            RoomCommands::Book {
                room,
                employee,
                minutes,
            } => rooms::run_book(&room, &employee, minutes, &config).await?,
            RoomCommands::Cancel { room } => rooms::run_cancel(&room, &config).await?,
        },
        Some(Commands::Alerts { command }) => match command {
            AlertCommands::List { all, json } => alerts::run_list(all, json, &config).await?,
            AlertCommands::Post {
                title,
                message,
                expires_in,
            } => alerts::run_post(&title, &message, expires_in, &config).await?,
            AlertCommands::Close { id } => alerts::run_close(&id, &config).await?,
        },
        Some(Commands::Org { command }) => match command {
            OrgCommands::Set { employee, manager } => {
                org::run_set(&employee, &manager, &config).await?;
            }
            OrgCommands::Remove { employee } => org::run_remove(&employee, &config).await?,
            OrgCommands::List { json } => org::run_list(json, &config).await?,
            OrgCommands::Tree => org::run_tree(&config).await?,
            OrgCommands::Chain { employee } => org::run_chain(&employee, &config).await?,
            OrgCommands::Reports { manager } => org::run_reports(&manager, &config).await?,
        },
        Some(Commands::Records { command }) => match command {
            RecordCommands::List { collection, json } => {
                records::run_list(&collection, json, &config).await?;
            }
            RecordCommands::Add { collection, fields } => {
                records::run_add(&collection, &fields, &config).await?;
            }
            RecordCommands::Remove { collection, id } => {
                records::run_remove(&collection, &id, &config).await?;
            }
        },
        Some(Commands::Completions { shell, output }) => {
            completions::run_completions(shell, output.as_deref())?;
        }
        None => {
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
