//! TomTimer CLI - time tasks from the terminal and keep them in two-way sync
//! with a shared checklist.

mod cli;
mod commands;
mod config_profiles;
mod error;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands, SyncCommands};
use crate::commands::add::run_add;
use crate::commands::common::{load_profile, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::sync::{run_sync, run_sync_collections};
use crate::commands::timer::{run_log, run_start, run_stop};
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

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "tomtimer=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let profile = cli.profile.as_deref();

    match cli.command {
        Some(Commands::Add { title, estimate }) => run_add(&title, estimate, &db_path).await?,
        Some(Commands::List { json }) => run_list(json, &db_path).await?,
        Some(Commands::Edit {
            id,
            title,
            estimate,
            remaining,
        }) => run_edit(&id, title.as_deref(), estimate, remaining, &db_path).await?,
        Some(Commands::Start { id }) => run_start(&id, &db_path).await?,
        Some(Commands::Stop { id }) => run_stop(&id, &db_path).await?,
        Some(Commands::Log { id, minutes }) => run_log(&id, minutes, &db_path).await?,
        Some(Commands::Delete { id }) => {
            let (_, sync_profile) = load_profile(profile)?;
            run_delete(&id, &db_path, sync_profile.as_ref()).await?;
        }
        Some(Commands::Sync {
            command,
            resolve,
            json,
        }) => {
            let (name, sync_profile) = load_profile(profile)?;
            tracing::debug!("Using profile '{name}'");
            match command {
                Some(SyncCommands::Collections { json }) => {
                    run_sync_collections(json, &db_path, sync_profile.as_ref()).await?;
                }
                None => run_sync(resolve, json, &db_path, sync_profile.as_ref()).await?,
            }
        }
        Some(Commands::Config { command }) => run_config(command, profile, &db_path)?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        None => {
            // Quick add mode: tomtimer "write the report"
            if cli.title.is_empty() {
                Cli::command().print_help().map_err(CliError::Io)?;
                println!();
            } else {
                run_add(&cli.title, None, &db_path).await?;
            }
        }
    }

    Ok(())
}
