use std::path::Path;

use tomtimer_core::models::ConflictDecision;
use tomtimer_core::sync::SyncOutcome;

use crate::cli::ResolveSide;
use crate::commands::common::{format_report_lines, open_orchestrator, open_tasks};
use crate::config_profiles::CliProfile;
use crate::error::CliError;

pub async fn run_sync(
    resolve: Option<ResolveSide>,
    as_json: bool,
    db_path: &Path,
    profile: Option<&CliProfile>,
) -> Result<(), CliError> {
    let orchestrator = open_orchestrator(open_tasks(db_path)?, profile)?;
    let decision = resolve.map_or(ConflictDecision::Skip, ResolveSide::decision);

    let outcome = orchestrator
        .sync(|conflict| {
            tracing::debug!(
                "Conflict on {} ({}): {decision:?}",
                conflict.task.id,
                conflict.remote_identifier()
            );
            decision
        })
        .await?;

    let report = match outcome {
        SyncOutcome::Completed(report) => report,
        SyncOutcome::AlreadyRunning => {
            println!("A sync is already running");
            return Ok(());
        }
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_report_lines(&report) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_sync_collections(
    as_json: bool,
    db_path: &Path,
    profile: Option<&CliProfile>,
) -> Result<(), CliError> {
    let orchestrator = open_orchestrator(open_tasks(db_path)?, profile)?;
    let collections = orchestrator.collections().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&collections)?);
        return Ok(());
    }

    if collections.is_empty() {
        println!("No collections found on {}", orchestrator.provider().path().display());
        return Ok(());
    }

    let selected = orchestrator.collection_id();
    for collection in &collections {
        let marker = if selected == Some(collection.identifier.as_str()) {
            '*'
        } else {
            ' '
        };
        println!("{marker} {:<24}  {}", collection.identifier, collection.title);
    }
    Ok(())
}
