use std::path::Path;

use crate::commands::common::{open_tasks, resolve_task};
use crate::error::CliError;

pub async fn run_start(id: &str, db_path: &Path) -> Result<(), CliError> {
    let tasks = open_tasks(db_path)?;
    let task = resolve_task(&tasks, id).await?;
    let started = tasks.start_task(&task.id).await?;

    println!(
        "Started \"{}\" ({} of {} min left)",
        started.title, started.remaining_minutes, started.estimated_minutes
    );
    Ok(())
}

pub async fn run_stop(id: &str, db_path: &Path) -> Result<(), CliError> {
    let tasks = open_tasks(db_path)?;
    let task = resolve_task(&tasks, id).await?;
    let stopped = tasks.stop_task(&task.id).await?;

    println!("Stopped \"{}\"", stopped.title);
    Ok(())
}

pub async fn run_log(id: &str, minutes: u32, db_path: &Path) -> Result<(), CliError> {
    let tasks = open_tasks(db_path)?;
    let task = resolve_task(&tasks, id).await?;
    let logged = tasks.log_minutes(&task.id, minutes).await?;

    if logged.is_complete() {
        println!("\"{}\" is done", logged.title);
    } else {
        println!(
            "\"{}\": {} of {} min left",
            logged.title, logged.remaining_minutes, logged.estimated_minutes
        );
    }
    Ok(())
}
