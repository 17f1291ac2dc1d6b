use std::path::Path;

use crate::commands::common::{open_orchestrator, open_tasks, resolve_task};
use crate::config_profiles::CliProfile;
use crate::error::CliError;

pub async fn run_delete(
    id: &str,
    db_path: &Path,
    profile: Option<&CliProfile>,
) -> Result<(), CliError> {
    let tasks = open_tasks(db_path)?;
    let task = resolve_task(&tasks, id).await?;

    if task.remote_identifier.is_none() {
        tasks.delete_task(&task.id).await?;
    } else {
        match open_orchestrator(tasks.clone(), profile) {
            Ok(orchestrator) => {
                orchestrator.delete_task(&task.id).await?;
            }
            Err(CliError::SyncNotConfigured) => {
                tracing::warn!(
                    "Sync is not configured; the remote copy of {} is left in place",
                    task.id
                );
                tasks.delete_task(&task.id).await?;
            }
            Err(error) => return Err(error),
        }
    }

    println!("{}", task.id);
    Ok(())
}
