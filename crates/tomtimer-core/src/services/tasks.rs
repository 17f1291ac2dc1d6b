//! Shared task service wrapper used by the sync engine and the CLI.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    Database, SettingsRepository, SqliteSettingsRepository, SqliteTaskRepository, TaskChanges,
    TaskRepository,
};
use crate::models::{Settings, Task, TaskId};
use crate::util::normalize_text_option;
use crate::{Error, Result};

/// Thread-safe service for DB and repository operations.
#[derive(Clone)]
pub struct TaskService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl TaskService {
    /// Open a task service at the given filesystem path.
    pub fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory task service (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Path of the backing database file, if any.
    pub fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// List all tasks, oldest first.
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let db = self.db.lock().await;
        SqliteTaskRepository::new(db.connection()).list()
    }

    /// Fetch a task by id.
    pub async fn get_task(&self, id: &TaskId) -> Result<Option<Task>> {
        let db = self.db.lock().await;
        SqliteTaskRepository::new(db.connection()).get(id)
    }

    /// Fetch the task linked to a remote record.
    pub async fn find_by_remote(&self, remote_identifier: &str) -> Result<Option<Task>> {
        let db = self.db.lock().await;
        SqliteTaskRepository::new(db.connection()).find_by_remote(remote_identifier)
    }

    /// Resolve a full or abbreviated task id.
    pub async fn resolve_task_id(&self, raw_id: &str) -> Result<TaskId> {
        let raw_id = raw_id.trim();
        if raw_id.is_empty() {
            return Err(Error::InvalidInput("Task id cannot be empty".into()));
        }
        if let Ok(id) = raw_id.parse::<TaskId>() {
            return Ok(id);
        }

        let matches = {
            let db = self.db.lock().await;
            SqliteTaskRepository::new(db.connection()).list_ids_by_prefix(raw_id, 2)?
        };

        match matches.as_slice() {
            [] => Err(Error::NotFound(raw_id.to_string())),
            [only] => only
                .parse()
                .map_err(|_| Error::InvalidInput(format!("Invalid task id: {only}"))),
            _ => Err(Error::InvalidInput(format!(
                "Task id prefix '{raw_id}' is ambiguous"
            ))),
        }
    }

    /// Create a new task, using the configured default when no estimate is given.
    pub async fn create_task(&self, title: &str, estimated_minutes: Option<u32>) -> Result<Task> {
        let db = self.db.lock().await;
        let estimate = match estimated_minutes {
            Some(minutes) => minutes,
            None => SqliteSettingsRepository::new(db.connection())
                .load()?
                .default_estimate_minutes,
        };
        let task = SqliteTaskRepository::new(db.connection()).create(title, estimate)?;
        tracing::debug!("Created task {}", task.id);
        Ok(task)
    }

    /// Edit title and estimates; absent values are left alone.
    pub async fn edit_task(
        &self,
        id: &TaskId,
        title: Option<&str>,
        estimated_minutes: Option<u32>,
        remaining_minutes: Option<u32>,
    ) -> Result<Task> {
        let title = normalize_text_option(title.map(str::to_string));
        self.mutate(id, |task| {
            if let Some(title) = title {
                task.rename(title);
            }
            if estimated_minutes.is_some() || remaining_minutes.is_some() {
                let estimated = estimated_minutes.unwrap_or(task.estimated_minutes);
                let remaining = remaining_minutes.unwrap_or(task.remaining_minutes);
                task.update_estimates(estimated, remaining);
            }
        })
        .await
    }

    /// Make a task the active one.
    pub async fn start_task(&self, id: &TaskId) -> Result<Task> {
        let db = self.db.lock().await;
        SqliteTaskRepository::new(db.connection()).activate(id)
    }

    /// Deactivate a task.
    pub async fn stop_task(&self, id: &TaskId) -> Result<Task> {
        self.mutate(id, |task| task.set_active(false)).await
    }

    /// Subtract minutes worked from a task's remaining time.
    pub async fn log_minutes(&self, id: &TaskId, minutes: u32) -> Result<Task> {
        self.mutate(id, |task| task.apply_completion(minutes)).await
    }

    /// Permanently delete a task, returning what was removed.
    pub async fn delete_task(&self, id: &TaskId) -> Result<Task> {
        let db = self.db.lock().await;
        let repo = SqliteTaskRepository::new(db.connection());
        let task = repo.get(id)?.ok_or_else(|| Error::NotFound(id.to_string()))?;
        repo.delete(id)?;
        Ok(task)
    }

    /// Overwrite a stored task.
    pub async fn save_task(&self, task: &Task) -> Result<()> {
        let db = self.db.lock().await;
        SqliteTaskRepository::new(db.connection()).save(task)
    }

    /// Apply reconciliation output atomically.
    pub async fn apply_changes(&self, changes: &TaskChanges) -> Result<()> {
        let db = self.db.lock().await;
        SqliteTaskRepository::new(db.connection()).apply_changes(changes)
    }

    /// Record remote identifiers assigned during a push.
    pub async fn link_remote(&self, links: &[(TaskId, String)]) -> Result<()> {
        let db = self.db.lock().await;
        SqliteTaskRepository::new(db.connection()).link_remote(links)
    }

    /// Load settings.
    pub async fn load_settings(&self) -> Result<Settings> {
        let db = self.db.lock().await;
        SqliteSettingsRepository::new(db.connection()).load()
    }

    /// Save settings.
    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        let db = self.db.lock().await;
        SqliteSettingsRepository::new(db.connection()).save(settings)
    }

    /// Stamp the completion time of a sync pass.
    pub async fn record_sync(&self, at: i64) -> Result<()> {
        let db = self.db.lock().await;
        let repo = SqliteSettingsRepository::new(db.connection());
        let mut settings = repo.load()?;
        settings.last_synced_at = Some(at);
        repo.save(&settings)
    }

    async fn mutate(&self, id: &TaskId, change: impl FnOnce(&mut Task)) -> Result<Task> {
        let db = self.db.lock().await;
        let repo = SqliteTaskRepository::new(db.connection());
        let mut task = repo.get(id)?.ok_or_else(|| Error::NotFound(id.to_string()))?;
        let before = task.clone();
        change(&mut task);
        if task != before {
            repo.save(&task)?;
        }
        Ok(task)
    }
}
