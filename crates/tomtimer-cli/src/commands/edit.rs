use std::path::Path;

use crate::commands::common::{normalize_title, open_tasks, resolve_task};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    title: Option<&str>,
    estimate: Option<u32>,
    remaining: Option<u32>,
    db_path: &Path,
) -> Result<(), CliError> {
    let title = match title {
        Some(raw) => Some(normalize_title(raw).ok_or(CliError::EmptyTitle)?),
        None => None,
    };
    if title.is_none() && estimate.is_none() && remaining.is_none() {
        return Err(CliError::NothingToEdit);
    }

    let tasks = open_tasks(db_path)?;
    let task = resolve_task(&tasks, id).await?;
    let updated = tasks
        .edit_task(&task.id, title.as_deref(), estimate, remaining)
        .await?;

    println!("{}", updated.id);
    Ok(())
}
