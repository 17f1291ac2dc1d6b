//! Reconciliation of local tasks against one fetched remote collection.
//!
//! Pure and synchronous: the same two input lists always produce the same
//! decisions, and nothing here touches the store or the provider.

use std::collections::{HashMap, HashSet};

use crate::models::{RemoteRecord, SyncConflict, Task, TaskId};

use super::metadata::{self, Metadata};

/// Decisions produced by one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Linked tasks overwritten with newer-or-equal remote values
    pub updated: Vec<Task>,
    /// Tasks materialized from remote records with no local counterpart
    pub created: Vec<Task>,
    /// Linked tasks whose remote record is gone
    pub deleted: Vec<TaskId>,
    /// Linked tasks that are newer locally but disagree with the remote copy
    pub conflicts: Vec<SyncConflict>,
}

impl Reconciliation {
    /// Whether applying this result would change the local store
    pub fn has_local_changes(&self) -> bool {
        !(self.updated.is_empty() && self.created.is_empty() && self.deleted.is_empty())
    }
}

/// Decode a record's metadata, falling back to its own modification time
/// (or `now`) when the notes carry no timestamp
pub fn decode_record(record: &RemoteRecord, now: i64) -> Metadata {
    metadata::decode(record.notes.as_deref(), record.last_modified.unwrap_or(now))
}

/// Compare local tasks with the full remote record set of one collection
///
/// `now` stamps newly materialized tasks and stands in for a missing remote
/// modification time.
pub fn reconcile(local: &[Task], remote: &[RemoteRecord], now: i64) -> Reconciliation {
    let mut linked: HashMap<&str, Vec<&Task>> = HashMap::new();
    for task in local {
        if let Some(remote_identifier) = task.remote_identifier.as_deref() {
            linked.entry(remote_identifier).or_default().push(task);
        }
    }

    let mut result = Reconciliation::default();
    let mut processed: HashSet<&str> = HashSet::new();

    for record in remote {
        let remote_identifier = record.remote_identifier.as_str();
        if !processed.insert(remote_identifier) {
            tracing::debug!("Skipping duplicate remote record {remote_identifier}");
            continue;
        }

        let remote_metadata = decode_record(record, now);

        let Some(tasks) = linked.get(remote_identifier) else {
            result
                .created
                .push(materialize(record, &remote_metadata, now));
            continue;
        };

        for task in tasks {
            if task.modified_at > remote_metadata.modified_at {
                if diverges(task, record, &remote_metadata) {
                    result
                        .conflicts
                        .push(conflict_for(task, record, &remote_metadata));
                }
            } else {
                let updated = apply_remote(task, record, &remote_metadata);
                if updated != **task {
                    result.updated.push(updated);
                }
            }
        }
    }

    for task in local {
        if let Some(remote_identifier) = task.remote_identifier.as_deref() {
            if !processed.contains(remote_identifier) {
                result.deleted.push(task.id);
            }
        }
    }

    tracing::debug!(
        "Reconciled {} local tasks against {} remote records: {} updated, {} created, {} deleted, {} conflicts",
        local.len(),
        remote.len(),
        result.updated.len(),
        result.created.len(),
        result.deleted.len(),
        result.conflicts.len()
    );

    result
}

/// Copy of `task` carrying the remote title and metadata
pub fn apply_remote(task: &Task, record: &RemoteRecord, remote_metadata: &Metadata) -> Task {
    let mut updated = task.clone();
    updated.title = remote_title(task, record).to_string();
    updated.estimated_minutes = remote_metadata.estimated_minutes;
    updated.remaining_minutes = clamped_remaining(remote_metadata);
    updated.is_active = remote_metadata.is_active;
    updated.modified_at = remote_metadata.modified_at;
    updated
}

fn materialize(record: &RemoteRecord, remote_metadata: &Metadata, now: i64) -> Task {
    Task {
        id: TaskId::new(),
        title: record.display_title().to_string(),
        estimated_minutes: remote_metadata.estimated_minutes,
        remaining_minutes: clamped_remaining(remote_metadata),
        is_active: remote_metadata.is_active,
        created_at: now,
        modified_at: remote_metadata.modified_at,
        remote_identifier: Some(record.remote_identifier.clone()),
    }
}

/// Remote title, keeping the local one when the remote title is blank
fn remote_title<'a>(task: &'a Task, record: &'a RemoteRecord) -> &'a str {
    let title = record.title.trim();
    if title.is_empty() {
        &task.title
    } else {
        title
    }
}

/// Remote remaining minutes as they would land locally
const fn clamped_remaining(remote_metadata: &Metadata) -> u32 {
    if remote_metadata.remaining_minutes > remote_metadata.estimated_minutes {
        remote_metadata.estimated_minutes
    } else {
        remote_metadata.remaining_minutes
    }
}

fn diverges(task: &Task, record: &RemoteRecord, remote_metadata: &Metadata) -> bool {
    task.title != remote_title(task, record)
        || task.estimated_minutes != remote_metadata.estimated_minutes
        || task.remaining_minutes != clamped_remaining(remote_metadata)
}

fn conflict_for(task: &Task, record: &RemoteRecord, remote_metadata: &Metadata) -> SyncConflict {
    SyncConflict {
        task: task.clone(),
        remote: record.clone(),
        local_title: task.title.clone(),
        remote_title: remote_title(task, record).to_string(),
        local_estimate: task.estimated_minutes,
        remote_estimate: remote_metadata.estimated_minutes,
        local_remaining: task.remaining_minutes,
        remote_remaining: clamped_remaining(remote_metadata),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::metadata::encode_metadata;
    use pretty_assertions::assert_eq;

    const NOW: i64 = 1_750_000_000_000;
    const T1: i64 = 1_740_000_000_000;
    const T2: i64 = 1_745_000_000_000;

    fn linked_task(title: &str, remote_identifier: &str, modified_at: i64) -> Task {
        let mut task = Task::new(title, 30);
        task.remote_identifier = Some(remote_identifier.to_string());
        task.modified_at = modified_at;
        task
    }

    fn record(
        remote_identifier: &str,
        title: &str,
        estimated: u32,
        remaining: u32,
        active: bool,
        modified_at: i64,
    ) -> RemoteRecord {
        RemoteRecord {
            remote_identifier: remote_identifier.to_string(),
            title: title.to_string(),
            notes: Some(encode_metadata(&Metadata {
                estimated_minutes: estimated,
                remaining_minutes: remaining,
                is_active: active,
                modified_at,
            })),
            completed: false,
            last_modified: Some(modified_at),
        }
    }

    #[test]
    fn local_newer_with_divergent_title_yields_one_conflict() {
        let task = linked_task("Write report", "R1", T2);
        let remote = record("R1", "Write summary", 30, 30, false, T1);

        let result = reconcile(std::slice::from_ref(&task), &[remote], NOW);

        assert_eq!(result.conflicts.len(), 1);
        let conflict = &result.conflicts[0];
        assert_eq!(conflict.task, task);
        assert_eq!(conflict.local_title, "Write report");
        assert_eq!(conflict.remote_title, "Write summary");
        assert_eq!(conflict.remote_identifier(), "R1");
        assert!(result.updated.is_empty());
        assert!(result.deleted.is_empty());
        assert!(result.created.is_empty());
    }

    #[test]
    fn local_newer_with_identical_values_is_untouched() {
        let task = linked_task("Write report", "R1", T2);
        let remote = record("R1", "Write report", 30, 30, true, T1);

        let result = reconcile(&[task], &[remote], NOW);

        assert!(!result.has_local_changes());
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn remote_newer_overwrites_local() {
        let task = linked_task("Write report", "R1", T1);
        let remote = record("R1", "Write summary", 50, 20, true, T2);

        let result = reconcile(std::slice::from_ref(&task), &[remote], NOW);

        assert!(result.conflicts.is_empty());
        assert_eq!(result.updated.len(), 1);
        let updated = &result.updated[0];
        assert_eq!(updated.id, task.id);
        assert_eq!(updated.title, "Write summary");
        assert_eq!(updated.estimated_minutes, 50);
        assert_eq!(updated.remaining_minutes, 20);
        assert!(updated.is_active);
        assert_eq!(updated.modified_at, T2);
    }

    #[test]
    fn equal_timestamps_take_remote_values() {
        let task = linked_task("Write report", "R1", T1);
        let remote = record("R1", "Write summary", 30, 30, false, T1);

        let result = reconcile(&[task], &[remote], NOW);

        assert!(result.conflicts.is_empty());
        assert_eq!(result.updated.len(), 1);
        assert_eq!(result.updated[0].title, "Write summary");
    }

    #[test]
    fn equal_timestamps_and_values_are_a_noop() {
        let task = linked_task("Write report", "R1", T1);
        let remote = record("R1", "Write report", 30, 30, false, T1);

        let result = reconcile(&[task], &[remote], NOW);

        assert_eq!(result, Reconciliation::default());
    }

    #[test]
    fn unmatched_remote_record_materializes_task() {
        let remote = record("R2", "Read paper", 40, 10, true, T1);

        let result = reconcile(&[], &[remote], NOW);

        assert_eq!(result.created.len(), 1);
        let created = &result.created[0];
        assert_eq!(created.title, "Read paper");
        assert_eq!(created.estimated_minutes, 40);
        assert_eq!(created.remaining_minutes, 10);
        assert!(created.is_active);
        assert_eq!(created.remote_identifier.as_deref(), Some("R2"));
        assert_eq!(created.modified_at, T1);
        assert_eq!(created.created_at, NOW);
    }

    #[test]
    fn unmatched_record_without_metadata_gets_defaults() {
        let remote = RemoteRecord {
            remote_identifier: "R4".to_string(),
            title: String::new(),
            notes: Some("pick up dry cleaning".to_string()),
            completed: false,
            last_modified: None,
        };

        let result = reconcile(&[], &[remote], NOW);

        let created = &result.created[0];
        assert_eq!(created.title, "Untitled");
        assert_eq!(created.estimated_minutes, 25);
        assert_eq!(created.remaining_minutes, 25);
        assert!(!created.is_active);
        assert_eq!(created.modified_at, NOW);
    }

    #[test]
    fn vanished_remote_record_deletes_linked_task() {
        let task = linked_task("Old", "R3", T1);
        let other = record("R9", "Other", 30, 30, false, T1);

        let result = reconcile(std::slice::from_ref(&task), &[other], NOW);

        assert_eq!(result.deleted, vec![task.id]);
    }

    #[test]
    fn unlinked_tasks_are_never_deleted() {
        let task = Task::new("Local only", 30);

        let empty = reconcile(std::slice::from_ref(&task), &[], NOW);
        let populated = reconcile(
            std::slice::from_ref(&task),
            &[record("R1", "Remote", 30, 30, false, T1)],
            NOW,
        );

        assert!(empty.deleted.is_empty());
        assert!(populated.deleted.is_empty());
        assert!(empty.updated.is_empty());
    }

    #[test]
    fn malformed_record_does_not_abort_pass() {
        let broken = RemoteRecord {
            remote_identifier: "R1".to_string(),
            title: "Broken".to_string(),
            notes: Some("TomTimer Task\nestimatedMinutes:??\nmodifiedAt:never".to_string()),
            completed: false,
            last_modified: Some(T2),
        };
        let healthy = record("R2", "Healthy", 10, 5, false, T1);

        let result = reconcile(&[], &[broken, healthy], NOW);

        assert_eq!(result.created.len(), 2);
        assert_eq!(result.created[0].estimated_minutes, 25);
        assert_eq!(result.created[0].modified_at, T2);
        assert_eq!(result.created[1].estimated_minutes, 10);
    }

    #[test]
    fn remote_remaining_is_clamped_to_estimate() {
        let remote = record("R5", "Clamp", 10, 40, false, T1);
        let result = reconcile(&[], &[remote], NOW);
        assert_eq!(result.created[0].remaining_minutes, 10);
    }

    #[test]
    fn overflowing_remote_remaining_is_compared_after_clamping() {
        let local = linked_task("Same", "R6", T2);
        let remote = record("R6", "Same", 30, 45, false, T1);

        let result = reconcile(&[local], &[remote], NOW);

        assert!(result.conflicts.is_empty());
        assert!(result.updated.is_empty());
    }

    #[test]
    fn conflict_reports_clamped_remote_remaining() {
        let local = linked_task("Local title", "R7", T2);
        let remote = record("R7", "Remote title", 20, 45, false, T1);

        let result = reconcile(&[local], &[remote], NOW);

        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].remote_remaining, 20);
    }

    #[test]
    fn every_matched_task_lands_in_exactly_one_outcome() {
        let conflicted = linked_task("Local title", "A", T2);
        let overwritten = linked_task("Stale", "B", T1);
        let identical = linked_task("Same", "C", T2);
        let orphan = linked_task("Gone", "D", T1);
        let unlinked = Task::new("Unlinked", 30);
        let local = vec![
            conflicted.clone(),
            overwritten.clone(),
            identical.clone(),
            orphan.clone(),
            unlinked,
        ];
        let remote = vec![
            record("A", "Remote title", 30, 30, false, T1),
            record("B", "Fresh", 30, 15, false, T2),
            record("C", "Same", 30, 30, false, T1),
            record("E", "New", 20, 20, false, T1),
        ];

        let result = reconcile(&local, &remote, NOW);

        let conflict_ids = result
            .conflicts
            .iter()
            .map(|conflict| conflict.task.id)
            .collect::<Vec<_>>();
        let updated_ids = result.updated.iter().map(|task| task.id).collect::<Vec<_>>();

        assert_eq!(conflict_ids, vec![conflicted.id]);
        assert_eq!(updated_ids, vec![overwritten.id]);
        assert!(!conflict_ids.contains(&identical.id));
        assert!(!updated_ids.contains(&identical.id));
        assert_eq!(result.deleted, vec![orphan.id]);
        assert_eq!(result.created.len(), 1);
        assert_eq!(result.created[0].remote_identifier.as_deref(), Some("E"));
    }

    #[test]
    fn duplicate_remote_identifiers_are_processed_once() {
        let remote = vec![
            record("R1", "First", 30, 30, false, T1),
            record("R1", "Second", 30, 30, false, T1),
        ];
        let result = reconcile(&[], &remote, NOW);
        assert_eq!(result.created.len(), 1);
        assert_eq!(result.created[0].title, "First");
    }
}
