//! Database layer for TomTimer

mod connection;
mod migrations;
mod repository;
mod settings_repository;

pub use connection::Database;
pub use repository::{SqliteTaskRepository, TaskChanges, TaskRepository};
pub use settings_repository::{SettingsRepository, SqliteSettingsRepository};
