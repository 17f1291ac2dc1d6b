//! Data models for TomTimer

mod remote;
mod settings;
mod sync_conflict;
mod task;

pub use remote::{RemoteCollection, RemoteRecord};
pub use settings::Settings;
pub use sync_conflict::{ConflictDecision, SyncConflict};
pub use task::{Task, TaskId, DEFAULT_ESTIMATE_MINUTES};
