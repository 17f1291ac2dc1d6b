use std::path::Path;

use crate::commands::common::{open_tasks, resolve_task_title};
use crate::error::CliError;

pub async fn run_add(
    title_parts: &[String],
    estimate: Option<u32>,
    db_path: &Path,
) -> Result<(), CliError> {
    let title = resolve_task_title(title_parts)?;

    let tasks = open_tasks(db_path)?;
    let task = tasks.create_task(&title, estimate).await?;

    println!("{}", task.id);
    Ok(())
}
