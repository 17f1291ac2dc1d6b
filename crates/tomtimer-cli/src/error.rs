use std::io;

use thiserror::Error;
use tomtimer_core::sync::SyncError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tomtimer_core::Error),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No task title provided")]
    EmptyTitle,
    #[error("Task ID cannot be empty")]
    EmptyTaskId,
    #[error("Task not found for id/prefix: {0}")]
    TaskNotFound(String),
    #[error("Nothing to change; pass --title, --estimate or --remaining")]
    NothingToEdit,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Run `tomtimer config init --store-path <PATH> --collection <ID>`."
    )]
    SyncNotConfigured,
}
