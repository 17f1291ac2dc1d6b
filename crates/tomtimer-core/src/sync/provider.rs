//! Remote task provider capability.
//!
//! Every external checklist service the app can sync with implements
//! [`TaskProvider`]. The reconciliation engine and orchestrator are written
//! against this trait only.

use thiserror::Error;

use crate::models::{RemoteCollection, RemoteRecord};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authorization denied. Grant access to the task provider and retry.")]
    AuthorizationDenied,
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
    #[error("Remote record not found: {0}")]
    NotFound(String),
    #[error("Provider network error: {0}")]
    Network(String),
    #[error("Provider IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid provider payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Whether this error must abort the whole sync pass rather than a
    /// single item
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthorizationDenied)
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A remote checklist service tasks can be synchronized with
#[allow(async_fn_in_trait)]
pub trait TaskProvider {
    /// Stable identifier, e.g. `"tomtimer.provider.json-file"`
    fn identifier(&self) -> &str;

    /// Name shown to users
    fn display_name(&self) -> &str;

    /// Whether the provider currently has access to the remote store
    fn is_authenticated(&self) -> bool;

    /// Request or verify access to the remote store
    async fn authenticate(&self) -> ProviderResult<()>;

    /// List the collections records can live in
    async fn list_collections(&self) -> ProviderResult<Vec<RemoteCollection>>;

    /// Fetch every record in a collection
    async fn list_records(&self, collection_id: &str) -> ProviderResult<Vec<RemoteRecord>>;

    /// Create a record and return its provider-assigned identifier
    async fn create_record(
        &self,
        collection_id: &str,
        title: &str,
        notes: &str,
    ) -> ProviderResult<String>;

    /// Overwrite an existing record
    async fn update_record(
        &self,
        remote_identifier: &str,
        title: &str,
        notes: &str,
        completed: bool,
    ) -> ProviderResult<()>;

    /// Delete a record
    async fn delete_record(&self, remote_identifier: &str) -> ProviderResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_authorization_errors_are_fatal() {
        assert!(ProviderError::AuthorizationDenied.is_fatal());
        assert!(!ProviderError::NotFound("R1".to_string()).is_fatal());
        assert!(!ProviderError::Network("timeout".to_string()).is_fatal());
        assert!(!ProviderError::NotConfigured("no list".to_string()).is_fatal());
    }

    #[test]
    fn not_found_is_detected() {
        assert!(ProviderError::NotFound("R1".to_string()).is_not_found());
        assert!(!ProviderError::AuthorizationDenied.is_not_found());
    }
}
