//! In-process task provider.
//!
//! Backs tests and offline demos. Records live in memory only; a failure
//! can be injected per record so partial push failures can be exercised.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::models::{RemoteCollection, RemoteRecord};
use crate::sync::{ProviderError, ProviderResult, TaskProvider};
use crate::util::unix_millis_now;

#[derive(Debug, Default)]
struct MemoryState {
    authorized: bool,
    collections: Vec<RemoteCollection>,
    /// Records keyed by collection identifier
    records: BTreeMap<String, Vec<RemoteRecord>>,
    /// Record identifiers or titles whose writes fail
    failing: HashSet<String>,
}

impl MemoryState {
    fn require_access(&self) -> ProviderResult<()> {
        if self.authorized {
            Ok(())
        } else {
            Err(ProviderError::AuthorizationDenied)
        }
    }

    fn require_writable(&self, key: &str) -> ProviderResult<()> {
        if self.failing.contains(key) {
            return Err(ProviderError::Network(format!("injected failure for {key}")));
        }
        Ok(())
    }

    fn find_mut(&mut self, remote_identifier: &str) -> Option<&mut RemoteRecord> {
        self.records
            .values_mut()
            .flat_map(|records| records.iter_mut())
            .find(|record| record.remote_identifier == remote_identifier)
    }
}

/// Task provider keeping its records in memory
#[derive(Debug)]
pub struct MemoryProvider {
    state: Mutex<MemoryState>,
}

impl MemoryProvider {
    pub const IDENTIFIER: &'static str = "tomtimer.provider.memory";

    /// Create an authorized provider with no collections
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                authorized: true,
                ..MemoryState::default()
            }),
        }
    }

    /// Add a collection
    #[must_use]
    pub fn with_collection(self, identifier: &str, title: &str) -> Self {
        {
            let mut state = self.lock();
            state.collections.push(RemoteCollection {
                identifier: identifier.to_string(),
                title: title.to_string(),
            });
            state.records.entry(identifier.to_string()).or_default();
        }
        self
    }

    /// Grant or revoke access
    pub fn set_authorized(&self, authorized: bool) {
        self.lock().authorized = authorized;
    }

    /// Make writes to a record identifier (or creates with a title) fail
    pub fn fail_writes_for(&self, key: &str) {
        self.lock().failing.insert(key.to_string());
    }

    /// Store a record directly, as if another client had written it
    pub fn put_record(&self, collection_id: &str, record: RemoteRecord) {
        let mut state = self.lock();
        let records = state.records.entry(collection_id.to_string()).or_default();
        match records
            .iter_mut()
            .find(|existing| existing.remote_identifier == record.remote_identifier)
        {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Remove a record directly, as if another client had deleted it
    pub fn remove_record(&self, remote_identifier: &str) {
        for records in self.lock().records.values_mut() {
            records.retain(|record| record.remote_identifier != remote_identifier);
        }
    }

    /// Look up a record by identifier
    pub fn record(&self, remote_identifier: &str) -> Option<RemoteRecord> {
        self.lock().find_mut(remote_identifier).map(|record| record.clone())
    }

    /// Snapshot of a collection's records
    pub fn records(&self, collection_id: &str) -> Vec<RemoteRecord> {
        self.lock()
            .records
            .get(collection_id)
            .cloned()
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskProvider for MemoryProvider {
    fn identifier(&self) -> &str {
        Self::IDENTIFIER
    }

    fn display_name(&self) -> &str {
        "In-memory list"
    }

    fn is_authenticated(&self) -> bool {
        self.lock().authorized
    }

    async fn authenticate(&self) -> ProviderResult<()> {
        self.lock().require_access()
    }

    async fn list_collections(&self) -> ProviderResult<Vec<RemoteCollection>> {
        let state = self.lock();
        state.require_access()?;
        Ok(state.collections.clone())
    }

    async fn list_records(&self, collection_id: &str) -> ProviderResult<Vec<RemoteRecord>> {
        let state = self.lock();
        state.require_access()?;
        state
            .records
            .get(collection_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(collection_id.to_string()))
    }

    async fn create_record(
        &self,
        collection_id: &str,
        title: &str,
        notes: &str,
    ) -> ProviderResult<String> {
        let mut state = self.lock();
        state.require_access()?;
        state.require_writable(title)?;

        let records = state
            .records
            .get_mut(collection_id)
            .ok_or_else(|| ProviderError::NotFound(collection_id.to_string()))?;
        let remote_identifier = Uuid::new_v4().to_string();
        records.push(RemoteRecord {
            remote_identifier: remote_identifier.clone(),
            title: title.to_string(),
            notes: Some(notes.to_string()),
            completed: false,
            last_modified: Some(unix_millis_now()),
        });
        Ok(remote_identifier)
    }

    async fn update_record(
        &self,
        remote_identifier: &str,
        title: &str,
        notes: &str,
        completed: bool,
    ) -> ProviderResult<()> {
        let mut state = self.lock();
        state.require_access()?;
        state.require_writable(remote_identifier)?;

        let record = state
            .find_mut(remote_identifier)
            .ok_or_else(|| ProviderError::NotFound(remote_identifier.to_string()))?;
        record.title = title.to_string();
        record.notes = Some(notes.to_string());
        record.completed = completed;
        record.last_modified = Some(unix_millis_now());
        Ok(())
    }

    async fn delete_record(&self, remote_identifier: &str) -> ProviderResult<()> {
        let mut state = self.lock();
        state.require_access()?;
        state.require_writable(remote_identifier)?;

        let mut removed = false;
        for records in state.records.values_mut() {
            let before = records.len();
            records.retain(|record| record.remote_identifier != remote_identifier);
            removed |= records.len() != before;
        }

        if removed {
            Ok(())
        } else {
            Err(ProviderError::NotFound(remote_identifier.to_string()))
        }
    }
}
