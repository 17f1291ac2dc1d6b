//! Sync conflict model

use serde::{Deserialize, Serialize};

use super::{RemoteRecord, Task};

/// A local task and its linked remote record that disagree
///
/// Produced by a reconciliation pass when the local copy is newer but its
/// values diverge from the remote copy. Never persisted; resolved or
/// discarded as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Local task as it was when the conflict was detected
    pub task: Task,
    /// Remote record snapshot the task was compared against
    pub remote: RemoteRecord,
    /// Local title
    pub local_title: String,
    /// Remote title
    pub remote_title: String,
    /// Local estimate in minutes
    pub local_estimate: u32,
    /// Remote estimate in minutes
    pub remote_estimate: u32,
    /// Local remaining minutes
    pub local_remaining: u32,
    /// Remote remaining minutes
    pub remote_remaining: u32,
}

impl SyncConflict {
    /// Identifier of the remote record both sides are linked through
    #[must_use]
    pub fn remote_identifier(&self) -> &str {
        &self.remote.remote_identifier
    }
}

/// Caller decision for a single conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictDecision {
    /// Local values win and are pushed to the remote record
    KeepLocal,
    /// Remote values overwrite the local task
    KeepRemote,
    /// Leave the conflict unresolved for a later pass
    Skip,
}
