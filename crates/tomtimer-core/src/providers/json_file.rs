//! Task provider backed by a JSON document on disk.
//!
//! The document can live on a shared or synced folder, so several clients
//! can reconcile against the same list. Every call reads the document
//! afresh and writes go through a temporary file and a rename.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{RemoteCollection, RemoteRecord};
use crate::sync::{ProviderError, ProviderResult, TaskProvider};
use crate::util::unix_millis_now;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCollection {
    identifier: String,
    title: String,
    #[serde(default)]
    records: Vec<RemoteRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    collections: Vec<StoredCollection>,
}

impl Document {
    fn collection_mut(&mut self, collection_id: &str) -> &mut StoredCollection {
        let index = match self
            .collections
            .iter()
            .position(|collection| collection.identifier == collection_id)
        {
            Some(index) => index,
            None => {
                self.collections.push(StoredCollection {
                    identifier: collection_id.to_string(),
                    title: collection_id.to_string(),
                    records: Vec::new(),
                });
                self.collections.len() - 1
            }
        };
        &mut self.collections[index]
    }

    fn record_mut(&mut self, remote_identifier: &str) -> Option<&mut RemoteRecord> {
        self.collections
            .iter_mut()
            .flat_map(|collection| collection.records.iter_mut())
            .find(|record| record.remote_identifier == remote_identifier)
    }
}

/// Task provider reading and writing a JSON document
#[derive(Debug)]
pub struct JsonFileProvider {
    path: PathBuf,
    authenticated: AtomicBool,
}

impl JsonFileProvider {
    pub const IDENTIFIER: &'static str = "tomtimer.provider.json-file";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            authenticated: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> ProviderResult<Document> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Document::default()),
            Err(error) => return Err(map_io_error(error)),
        };

        if raw.trim().is_empty() {
            return Ok(Document::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn store(&self, document: &Document) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(map_io_error)?;
            }
        }

        let payload = serde_json::to_string_pretty(document)?;
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, payload).map_err(map_io_error)?;
        std::fs::rename(&staging, &self.path).map_err(map_io_error)?;
        Ok(())
    }

    fn update(&self, change: impl FnOnce(&mut Document) -> ProviderResult<()>) -> ProviderResult<()> {
        let mut document = self.load()?;
        change(&mut document)?;
        self.store(&document)
    }
}

fn map_io_error(error: std::io::Error) -> ProviderError {
    if error.kind() == ErrorKind::PermissionDenied {
        ProviderError::AuthorizationDenied
    } else {
        ProviderError::Io(error)
    }
}

impl TaskProvider for JsonFileProvider {
    fn identifier(&self) -> &str {
        Self::IDENTIFIER
    }

    fn display_name(&self) -> &str {
        "JSON task file"
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    async fn authenticate(&self) -> ProviderResult<()> {
        let result = self.load().and_then(|document| {
            if self.path.exists() {
                // Probe write access without touching the contents
                std::fs::OpenOptions::new()
                    .append(true)
                    .open(&self.path)
                    .map(drop)
                    .map_err(map_io_error)
            } else {
                self.store(&document)
            }
        });

        self.authenticated.store(result.is_ok(), Ordering::Release);
        if let Err(error) = &result {
            tracing::warn!("Cannot access task file {}: {error}", self.path.display());
        }
        result
    }

    async fn list_collections(&self) -> ProviderResult<Vec<RemoteCollection>> {
        Ok(self
            .load()?
            .collections
            .into_iter()
            .map(|collection| RemoteCollection {
                identifier: collection.identifier,
                title: collection.title,
            })
            .collect())
    }

    async fn list_records(&self, collection_id: &str) -> ProviderResult<Vec<RemoteRecord>> {
        Ok(self
            .load()?
            .collections
            .into_iter()
            .find(|collection| collection.identifier == collection_id)
            .map(|collection| collection.records)
            .unwrap_or_default())
    }

    async fn create_record(
        &self,
        collection_id: &str,
        title: &str,
        notes: &str,
    ) -> ProviderResult<String> {
        let remote_identifier = Uuid::new_v4().to_string();
        self.update(|document| {
            document.collection_mut(collection_id).records.push(RemoteRecord {
                remote_identifier: remote_identifier.clone(),
                title: title.to_string(),
                notes: Some(notes.to_string()),
                completed: false,
                last_modified: Some(unix_millis_now()),
            });
            Ok(())
        })?;
        Ok(remote_identifier)
    }

    async fn update_record(
        &self,
        remote_identifier: &str,
        title: &str,
        notes: &str,
        completed: bool,
    ) -> ProviderResult<()> {
        self.update(|document| {
            let record = document
                .record_mut(remote_identifier)
                .ok_or_else(|| ProviderError::NotFound(remote_identifier.to_string()))?;
            record.title = title.to_string();
            record.notes = Some(notes.to_string());
            record.completed = completed;
            record.last_modified = Some(unix_millis_now());
            Ok(())
        })
    }

    async fn delete_record(&self, remote_identifier: &str) -> ProviderResult<()> {
        self.update(|document| {
            let mut removed = false;
            for collection in &mut document.collections {
                let before = collection.records.len();
                collection
                    .records
                    .retain(|record| record.remote_identifier != remote_identifier);
                removed |= collection.records.len() != before;
            }

            if removed {
                Ok(())
            } else {
                Err(ProviderError::NotFound(remote_identifier.to_string()))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn authenticate_creates_missing_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("lists").join("tasks.json");
        let provider = JsonFileProvider::new(&path);

        assert!(!provider.is_authenticated());
        provider.authenticate().await.unwrap();

        assert!(provider.is_authenticated());
        assert!(path.exists());
        assert!(provider.list_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn records_persist_across_instances() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("tasks.json");

        let writer = JsonFileProvider::new(&path);
        let id = writer.create_record("inbox", "Call back", "n").await.unwrap();
        writer.update_record(&id, "Call back", "n2", true).await.unwrap();

        let reader = JsonFileProvider::new(&path);
        let records = reader.list_records("inbox").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].remote_identifier, id);
        assert_eq!(records[0].notes.as_deref(), Some("n2"));
        assert!(records[0].completed);

        let collections = reader.list_collections().await.unwrap();
        assert_eq!(collections[0].identifier, "inbox");
    }

    #[tokio::test]
    async fn reads_hand_written_documents() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("tasks.json");
        std::fs::write(
            &path,
            r#"{"collections":[{"identifier":"work","title":"Work","records":[
                {"remoteIdentifier":"R1","title":"Plan","notes":null}
            ]}]}"#,
        )
        .unwrap();

        let provider = JsonFileProvider::new(&path);
        let records = provider.list_records("work").await.unwrap();
        assert_eq!(records[0].remote_identifier, "R1");
        assert!(!records[0].completed);
        assert!(records[0].last_modified.is_none());
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let tmp = tempdir().unwrap();
        let provider = JsonFileProvider::new(tmp.path().join("tasks.json"));

        assert!(provider
            .update_record("nope", "t", "", false)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(provider.delete_record("nope").await.unwrap_err().is_not_found());
        assert!(provider.list_records("empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_document_is_a_serialization_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("tasks.json");
        std::fs::write(&path, "{not json").unwrap();

        let provider = JsonFileProvider::new(&path);
        assert!(matches!(
            provider.list_records("work").await,
            Err(ProviderError::Serialization(_))
        ));
    }

    #[test]
    fn permission_denied_maps_to_authorization() {
        let error = std::io::Error::from(ErrorKind::PermissionDenied);
        assert!(map_io_error(error).is_fatal());
        let other = std::io::Error::from(ErrorKind::Other);
        assert!(matches!(map_io_error(other), ProviderError::Io(_)));
    }
}
