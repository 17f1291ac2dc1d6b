//! Drives full sync passes between the local store and one remote collection.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use thiserror::Error;

use crate::db::TaskChanges;
use crate::models::{ConflictDecision, RemoteCollection, SyncConflict, Task, TaskId};
use crate::services::TaskService;
use crate::util::{compact_text, unix_millis_now};

use super::metadata;
use super::provider::{ProviderError, TaskProvider};
use super::reconcile::{reconcile, Reconciliation};
use super::resolve::{resolve, resolve_with, ConflictEffect, Resolution};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No remote collection selected. Choose one before syncing.")]
    NoCollectionSelected,
    #[error("Sync unavailable: {0}")]
    Authorization(#[source] ProviderError),
    #[error("Failed to fetch remote records: {0}")]
    Fetch(#[source] ProviderError),
    #[error("Remote record {0} no longer exists")]
    RecordGone(String),
    #[error("Remote write failed: {0}")]
    Remote(#[source] ProviderError),
    #[error(transparent)]
    Store(#[from] crate::Error),
}

impl SyncError {
    fn from_provider(error: ProviderError, otherwise: fn(ProviderError) -> Self) -> Self {
        if error.is_fatal() {
            Self::Authorization(error)
        } else {
            otherwise(error)
        }
    }
}

/// A task whose push failed during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushFailure {
    pub task_id: TaskId,
    pub title: String,
    pub reason: String,
}

/// Summary of one completed sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Local tasks overwritten from remote values
    pub updated: usize,
    /// Local tasks materialized from new remote records
    pub created: usize,
    /// Local tasks removed because their remote record vanished
    pub deleted: usize,
    /// Remote records written during the push phase
    pub pushed: usize,
    /// Remote identifiers newly recorded on local tasks
    pub linked: usize,
    /// Conflicts settled by the caller's decision
    pub resolved: usize,
    /// Conflicts left for a later pass
    pub conflicts: Vec<SyncConflict>,
    pub failures: Vec<PushFailure>,
    pub finished_at: i64,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Another pass was already running; nothing was done
    AlreadyRunning,
}

struct InProgress<'a>(&'a AtomicBool);

impl<'a> InProgress<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

enum PushResult {
    Updated,
    Created(String),
}

/// Sync driver for one provider and one selected collection
pub struct SyncOrchestrator<P> {
    provider: P,
    tasks: TaskService,
    collection_id: Option<String>,
    in_progress: AtomicBool,
}

impl<P: TaskProvider> SyncOrchestrator<P> {
    pub const fn new(provider: P, tasks: TaskService, collection_id: Option<String>) -> Self {
        Self {
            provider,
            tasks,
            collection_id,
            in_progress: AtomicBool::new(false),
        }
    }

    pub const fn provider(&self) -> &P {
        &self.provider
    }

    pub const fn tasks(&self) -> &TaskService {
        &self.tasks
    }

    pub fn collection_id(&self) -> Option<&str> {
        self.collection_id.as_deref()
    }

    pub fn select_collection(&mut self, collection_id: impl Into<String>) {
        self.collection_id = Some(collection_id.into());
    }

    /// Whether a pass is currently running
    pub fn is_syncing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Collections available on the provider
    pub async fn collections(&self) -> Result<Vec<RemoteCollection>, SyncError> {
        self.ensure_authenticated().await?;
        self.provider
            .list_collections()
            .await
            .map_err(|error| SyncError::from_provider(error, SyncError::Fetch))
    }

    /// Run one full sync pass
    ///
    /// `decide` is asked once per conflict. Skipped conflicts keep their
    /// task out of the push phase and come back on the next pass.
    pub async fn sync(
        &self,
        mut decide: impl FnMut(&SyncConflict) -> ConflictDecision,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(_guard) = InProgress::acquire(&self.in_progress) else {
            tracing::debug!("Sync already in progress; ignoring request");
            return Ok(SyncOutcome::AlreadyRunning);
        };

        let collection_id = self
            .collection_id
            .as_deref()
            .ok_or(SyncError::NoCollectionSelected)?;
        self.ensure_authenticated().await?;

        tracing::info!(
            "Syncing with {} collection {collection_id}",
            self.provider.display_name()
        );

        let records = self
            .provider
            .list_records(collection_id)
            .await
            .map_err(|error| SyncError::from_provider(error, SyncError::Fetch))?;
        let local = self.tasks.list_tasks().await?;
        let now = unix_millis_now();

        let Reconciliation {
            updated,
            created,
            deleted,
            conflicts,
        } = reconcile(&local, &records, now);

        let mut changes = TaskChanges {
            updated,
            created,
            deleted,
        };
        let mut report = SyncReport::default();
        let mut held_back: HashSet<TaskId> = HashSet::new();

        for conflict in conflicts {
            let decision = decide(&conflict);
            match resolve_with(conflict, decision, now) {
                Resolution::Resolved(ConflictEffect::PushLocal(_)) => report.resolved += 1,
                Resolution::Resolved(ConflictEffect::OverwriteLocal(task)) => {
                    report.resolved += 1;
                    changes.updated.push(task);
                }
                Resolution::Unresolved(conflict) => {
                    held_back.insert(conflict.task.id);
                    report.conflicts.push(conflict);
                }
            }
        }

        report.updated = changes.updated.len();
        report.created = changes.created.len();
        report.deleted = changes.deleted.len();
        self.tasks.apply_changes(&changes).await?;

        let mut links = Vec::new();
        let mut fatal = None;
        for task in self.tasks.list_tasks().await? {
            if held_back.contains(&task.id) {
                continue;
            }

            match self.push(collection_id, &task).await {
                Ok(PushResult::Updated) => report.pushed += 1,
                Ok(PushResult::Created(remote_identifier)) => {
                    report.pushed += 1;
                    links.push((task.id, remote_identifier));
                }
                Err(error) if error.is_fatal() => {
                    fatal = Some(error);
                    break;
                }
                Err(error) => {
                    tracing::warn!("Failed to push task {}: {error}", task.id);
                    report.failures.push(PushFailure {
                        task_id: task.id,
                        title: compact_text(&task.title),
                        reason: error.to_string(),
                    });
                }
            }
        }

        // Links for records already created must land even if the pass aborts
        report.linked = links.len();
        self.tasks.link_remote(&links).await?;

        if let Some(error) = fatal {
            tracing::error!("Sync aborted during push: {error}");
            return Err(SyncError::Authorization(error));
        }

        report.finished_at = unix_millis_now();
        self.tasks.record_sync(report.finished_at).await?;

        tracing::info!(
            "Sync finished: {} updated, {} created, {} deleted, {} pushed, {} conflicts, {} failures",
            report.updated,
            report.created,
            report.deleted,
            report.pushed,
            report.conflicts.len(),
            report.failures.len()
        );

        Ok(SyncOutcome::Completed(report))
    }

    /// Settle a conflict outside a sync pass
    ///
    /// The remote record is fetched again so that keeping the remote side
    /// applies its current values. Returns the task as it now stands locally.
    pub async fn resolve_conflict(
        &self,
        mut conflict: SyncConflict,
        keep_local: bool,
    ) -> Result<Task, SyncError> {
        let collection_id = self
            .collection_id
            .as_deref()
            .ok_or(SyncError::NoCollectionSelected)?;
        self.ensure_authenticated().await?;

        let remote_identifier = conflict.remote_identifier().to_string();
        conflict.task = self
            .tasks
            .get_task(&conflict.task.id)
            .await?
            .ok_or_else(|| crate::Error::NotFound(conflict.task.id.to_string()))?;

        if keep_local {
            let task = resolve(conflict, true, unix_millis_now()).task().clone();
            return match self.push(collection_id, &task).await {
                Ok(PushResult::Updated) => Ok(task),
                Ok(PushResult::Created(new_identifier)) => {
                    self.tasks
                        .link_remote(&[(task.id, new_identifier.clone())])
                        .await?;
                    Ok(Task {
                        remote_identifier: Some(new_identifier),
                        ..task
                    })
                }
                Err(error) => Err(SyncError::from_provider(error, SyncError::Remote)),
            };
        }

        let records = self
            .provider
            .list_records(collection_id)
            .await
            .map_err(|error| SyncError::from_provider(error, SyncError::Fetch))?;
        conflict.remote = records
            .into_iter()
            .find(|record| record.remote_identifier == remote_identifier)
            .ok_or(SyncError::RecordGone(remote_identifier))?;

        let effect = resolve(conflict, false, unix_millis_now());
        let task = effect.task().clone();
        self.tasks.save_task(&task).await?;
        Ok(task)
    }

    /// Delete a task locally and, when linked, its remote record
    ///
    /// A remote record that is already gone is not an error.
    pub async fn delete_task(&self, id: &TaskId) -> Result<Task, SyncError> {
        let task = self
            .tasks
            .get_task(id)
            .await?
            .ok_or_else(|| crate::Error::NotFound(id.to_string()))?;

        if let Some(remote_identifier) = task.remote_identifier.as_deref() {
            self.ensure_authenticated().await?;
            match self.provider.delete_record(remote_identifier).await {
                Ok(()) => tracing::debug!("Deleted remote record {remote_identifier}"),
                Err(error) if error.is_not_found() => {
                    tracing::debug!("Remote record {remote_identifier} already gone");
                }
                Err(error) => return Err(SyncError::from_provider(error, SyncError::Remote)),
            }
        }

        Ok(self.tasks.delete_task(id).await?)
    }

    async fn ensure_authenticated(&self) -> Result<(), SyncError> {
        if self.provider.is_authenticated() {
            return Ok(());
        }
        self.provider
            .authenticate()
            .await
            .map_err(SyncError::Authorization)
    }

    /// Create-or-update the remote copy of a task
    async fn push(&self, collection_id: &str, task: &Task) -> Result<PushResult, ProviderError> {
        let notes = metadata::encode(task);

        if let Some(remote_identifier) = task.remote_identifier.as_deref() {
            match self
                .provider
                .update_record(remote_identifier, &task.title, &notes, task.is_complete())
                .await
            {
                Ok(()) => return Ok(PushResult::Updated),
                Err(error) if error.is_not_found() => {
                    tracing::debug!(
                        "Remote record {remote_identifier} vanished; recreating task {}",
                        task.id
                    );
                }
                Err(error) => return Err(error),
            }
        }

        let remote_identifier = self
            .provider
            .create_record(collection_id, &task.title, &notes)
            .await?;
        if task.is_complete() {
            if let Err(error) = self
                .provider
                .update_record(&remote_identifier, &task.title, &notes, true)
                .await
            {
                tracing::warn!(
                    "Failed to mark remote record {remote_identifier} completed: {error}"
                );
            }
        }
        Ok(PushResult::Created(remote_identifier))
    }
}
