//! Task repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::error::{Error, Result};
use crate::models::{Task, TaskId};
use rusqlite::{params, Connection, OptionalExtension};

const TASK_COLUMNS: &str = "id, title, estimated_minutes, remaining_minutes, is_active, created_at, modified_at, remote_identifier";

/// Local changes produced by one reconciliation pass
///
/// Applied atomically by [`TaskRepository::apply_changes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    /// Existing tasks to overwrite
    pub updated: Vec<Task>,
    /// New tasks to insert
    pub created: Vec<Task>,
    /// Tasks to remove
    pub deleted: Vec<TaskId>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.created.is_empty() && self.deleted.is_empty()
    }
}

/// Trait for task storage operations
pub trait TaskRepository {
    /// Create and store a new task
    fn create(&self, title: &str, estimated_minutes: u32) -> Result<Task>;

    /// Store a task built elsewhere
    fn insert(&self, task: &Task) -> Result<()>;

    /// Get a task by ID
    fn get(&self, id: &TaskId) -> Result<Option<Task>>;

    /// Get the task linked to a remote record
    fn find_by_remote(&self, remote_identifier: &str) -> Result<Option<Task>>;

    /// List all tasks, oldest first
    fn list(&self) -> Result<Vec<Task>>;

    /// List task IDs starting with a prefix
    fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>>;

    /// Overwrite every stored field of an existing task
    fn save(&self, task: &Task) -> Result<()>;

    /// Permanently delete a task
    fn delete(&self, id: &TaskId) -> Result<()>;

    /// Make a task the active one, deactivating all others
    fn activate(&self, id: &TaskId) -> Result<Task>;

    /// Apply reconciliation output in a single transaction
    fn apply_changes(&self, changes: &TaskChanges) -> Result<()>;

    /// Record remote identifiers in a single transaction
    fn link_remote(&self, links: &[(TaskId, String)]) -> Result<()>;
}

/// `SQLite` implementation of `TaskRepository`
pub struct SqliteTaskRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteTaskRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a task from a database row
    fn parse_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
        let id: String = row.get(0)?;
        Ok(Task {
            id: id.parse().unwrap_or_default(),
            title: row.get(1)?,
            estimated_minutes: row.get(2)?,
            remaining_minutes: row.get(3)?,
            is_active: row.get::<_, i32>(4)? != 0,
            created_at: row.get(5)?,
            modified_at: row.get(6)?,
            remote_identifier: row.get(7)?,
        })
    }

    fn query_one(&self, clause: &str, value: &str) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE {clause} = ?"),
                params![value],
                Self::parse_task,
            )
            .optional()?;
        Ok(task)
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create(&self, title: &str, estimated_minutes: u32) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("Task title cannot be empty".into()));
        }

        let task = Task::new(title, estimated_minutes);
        self.insert(&task)?;
        Ok(task)
    }

    fn insert(&self, task: &Task) -> Result<()> {
        self.conn.execute(
            &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"),
            params![
                task.id.as_str(),
                task.title,
                task.estimated_minutes,
                task.remaining_minutes,
                i32::from(task.is_active),
                task.created_at,
                task.modified_at,
                task.remote_identifier,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &TaskId) -> Result<Option<Task>> {
        self.query_one("id", &id.as_str())
    }

    fn find_by_remote(&self, remote_identifier: &str) -> Result<Option<Task>> {
        self.query_one("remote_identifier", remote_identifier)
    }

    fn list(&self) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at ASC, id ASC"
        ))?;

        let tasks = stmt
            .query_map([], Self::parse_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tasks)
    }

    fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM tasks WHERE id LIKE ? || '%' ORDER BY created_at DESC LIMIT ?",
        )?;

        let ids = stmt
            .query_map(params![prefix, limit as i64], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(ids)
    }

    fn save(&self, task: &Task) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE tasks
             SET title = ?, estimated_minutes = ?, remaining_minutes = ?, is_active = ?,
                 created_at = ?, modified_at = ?, remote_identifier = ?
             WHERE id = ?",
            params![
                task.title,
                task.estimated_minutes,
                task.remaining_minutes,
                i32::from(task.is_active),
                task.created_at,
                task.modified_at,
                task.remote_identifier,
                task.id.as_str(),
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(task.id.to_string()));
        }

        Ok(())
    }

    fn delete(&self, id: &TaskId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?", params![id.as_str()])?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }

    fn activate(&self, id: &TaskId) -> Result<Task> {
        let tx = self.conn.unchecked_transaction()?;
        let scoped = SqliteTaskRepository::new(&tx);

        let mut task = scoped
            .get(id)?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        for mut other in scoped.list()? {
            if other.is_active && other.id != task.id {
                other.set_active(false);
                scoped.save(&other)?;
            }
        }

        task.set_active(true);
        scoped.save(&task)?;
        tx.commit()?;

        Ok(task)
    }

    fn apply_changes(&self, changes: &TaskChanges) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        let scoped = SqliteTaskRepository::new(&tx);

        // Deletions first so a freed remote identifier can be reused
        for id in &changes.deleted {
            tx.execute("DELETE FROM tasks WHERE id = ?", params![id.as_str()])?;
        }
        for task in &changes.updated {
            scoped.save(task)?;
        }
        for task in &changes.created {
            scoped.insert(task)?;
        }

        tx.commit()?;

        tracing::debug!(
            updated = changes.updated.len(),
            created = changes.created.len(),
            deleted = changes.deleted.len(),
            "Applied reconciliation to local store"
        );
        Ok(())
    }

    fn link_remote(&self, links: &[(TaskId, String)]) -> Result<()> {
        if links.is_empty() {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        for (id, remote_identifier) in links {
            // A task deleted while its push was in flight is skipped
            tx.execute(
                "UPDATE tasks SET remote_identifier = ? WHERE id = ?",
                params![remote_identifier, id.as_str()],
            )?;
        }
        tx.commit()?;

        Ok(())
    }
}
