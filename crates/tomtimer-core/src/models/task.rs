//! Task model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::util::unix_millis_now;

/// Estimate given to tasks that arrive without one
pub const DEFAULT_ESTIMATE_MINUTES: u32 = 25;

/// A unique local identifier for a task, using UUID v7 (time-sortable)
///
/// Never transmitted to a remote provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Create a new unique task ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A unit of work tracked by the timer
///
/// `remaining_minutes` never exceeds `estimated_minutes`; every mutator that
/// touches sync-relevant fields bumps `modified_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Local identifier
    pub id: TaskId,
    /// Free-text title
    pub title: String,
    /// Total estimate in minutes
    pub estimated_minutes: u32,
    /// Minutes still left on the estimate
    pub remaining_minutes: u32,
    /// Whether this is the task the timer is currently counting against
    pub is_active: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last sync-relevant mutation (Unix ms)
    pub modified_at: i64,
    /// Identifier of the linked remote record, `None` if never synced
    pub remote_identifier: Option<String>,
}

impl Task {
    /// Create a new, inactive task with the full estimate remaining
    #[must_use]
    pub fn new(title: impl Into<String>, estimated_minutes: u32) -> Self {
        let now = unix_millis_now();
        Self {
            id: TaskId::new(),
            title: title.into(),
            estimated_minutes,
            remaining_minutes: estimated_minutes,
            is_active: false,
            created_at: now,
            modified_at: now,
            remote_identifier: None,
        }
    }

    /// Subtract minutes logged by a finished timer session
    pub fn apply_completion(&mut self, minutes: u32) {
        if minutes == 0 || self.remaining_minutes == 0 {
            return;
        }
        self.remaining_minutes = self.remaining_minutes.saturating_sub(minutes);
        self.touch();
    }

    /// Replace both estimates, clamping remaining into `0..=estimated`
    pub fn update_estimates(&mut self, estimated: u32, remaining: u32) {
        let remaining = remaining.min(estimated);
        if estimated == self.estimated_minutes && remaining == self.remaining_minutes {
            return;
        }
        self.estimated_minutes = estimated;
        self.remaining_minutes = remaining;
        self.touch();
    }

    /// Change the title
    pub fn rename(&mut self, title: impl Into<String>) {
        let title = title.into();
        if title == self.title {
            return;
        }
        self.title = title;
        self.touch();
    }

    /// Mark the task active or inactive
    pub fn set_active(&mut self, is_active: bool) {
        if is_active == self.is_active {
            return;
        }
        self.is_active = is_active;
        self.touch();
    }

    /// Whether the whole estimate has been used up
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.remaining_minutes == 0
    }

    /// Bump the modification time, never moving it backwards
    fn touch(&mut self) {
        self.modified_at = unix_millis_now().max(self.modified_at.saturating_add(1));
    }
}
