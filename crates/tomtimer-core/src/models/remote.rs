//! Records owned by a remote task provider

use serde::{Deserialize, Serialize};

/// An item in the external checklist service
///
/// The engine only ever sees snapshots of these; the provider owns the
/// live record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    /// Opaque identifier assigned by the provider on creation
    pub remote_identifier: String,
    /// Free-text title
    pub title: String,
    /// Free-text notes field carrying the encoded task metadata
    #[serde(default)]
    pub notes: Option<String>,
    /// Provider-native completion flag
    #[serde(default)]
    pub completed: bool,
    /// Provider-native modification time (Unix ms)
    #[serde(default)]
    pub last_modified: Option<i64>,
}

impl RemoteRecord {
    /// Title to use when materializing a local task from this record
    #[must_use]
    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() {
            "Untitled"
        } else {
            title
        }
    }
}

/// A list/collection in the remote provider that records live in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCollection {
    /// Provider identifier of the collection
    pub identifier: String,
    /// Human-readable collection name
    pub title: String,
}
