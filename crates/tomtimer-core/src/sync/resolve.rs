//! Whole-record resolution of sync conflicts.

use crate::models::{ConflictDecision, SyncConflict, Task};

use super::reconcile::{apply_remote, decode_record};

/// What resolving a conflict requires of the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictEffect {
    /// Local values stand; push the task to overwrite the remote record
    PushLocal(Task),
    /// Persist the task, now carrying the remote values
    OverwriteLocal(Task),
}

impl ConflictEffect {
    pub const fn task(&self) -> &Task {
        match self {
            Self::PushLocal(task) | Self::OverwriteLocal(task) => task,
        }
    }
}

/// Resolve a conflict, consuming it
///
/// Keeping the remote side re-decodes the record's notes rather than
/// trusting the values captured when the conflict was detected. `now`
/// stands in for a missing remote timestamp.
pub fn resolve(conflict: SyncConflict, keep_local: bool, now: i64) -> ConflictEffect {
    if keep_local {
        return ConflictEffect::PushLocal(conflict.task);
    }

    let remote_metadata = decode_record(&conflict.remote, now);
    ConflictEffect::OverwriteLocal(apply_remote(
        &conflict.task,
        &conflict.remote,
        &remote_metadata,
    ))
}

/// Outcome of applying a caller decision to a conflict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ConflictEffect),
    /// Skipped; the conflict is handed back to the caller
    Unresolved(SyncConflict),
}

/// Apply a caller decision to a conflict
pub fn resolve_with(conflict: SyncConflict, decision: ConflictDecision, now: i64) -> Resolution {
    match decision {
        ConflictDecision::KeepLocal => Resolution::Resolved(resolve(conflict, true, now)),
        ConflictDecision::KeepRemote => Resolution::Resolved(resolve(conflict, false, now)),
        ConflictDecision::Skip => Resolution::Unresolved(conflict),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RemoteRecord;
    use crate::sync::metadata::{encode_metadata, Metadata};
    use pretty_assertions::assert_eq;

    const NOW: i64 = 1_750_000_000_000;

    fn conflict() -> SyncConflict {
        let mut task = Task::new("Local title", 30);
        task.remote_identifier = Some("R1".to_string());
        task.update_estimates(30, 20);

        let remote = RemoteRecord {
            remote_identifier: "R1".to_string(),
            title: "Remote title".to_string(),
            notes: Some(encode_metadata(&Metadata {
                estimated_minutes: 45,
                remaining_minutes: 40,
                is_active: true,
                modified_at: 1_700_000_000_000,
            })),
            completed: false,
            last_modified: Some(1_700_000_000_000),
        };

        SyncConflict {
            local_title: task.title.clone(),
            remote_title: remote.title.clone(),
            local_estimate: task.estimated_minutes,
            remote_estimate: 45,
            local_remaining: task.remaining_minutes,
            remote_remaining: 40,
            task,
            remote,
        }
    }

    #[test]
    fn keep_local_never_mutates_task() {
        let conflict = conflict();
        let original = conflict.task.clone();

        let effect = resolve(conflict, true, NOW);

        assert_eq!(effect, ConflictEffect::PushLocal(original));
    }

    #[test]
    fn keep_remote_overwrites_all_fields() {
        let conflict = conflict();
        let id = conflict.task.id;

        let ConflictEffect::OverwriteLocal(task) = resolve(conflict, false, NOW) else {
            panic!("expected overwrite");
        };

        assert_eq!(task.id, id);
        assert_eq!(task.title, "Remote title");
        assert_eq!(task.estimated_minutes, 45);
        assert_eq!(task.remaining_minutes, 40);
        assert!(task.is_active);
        assert_eq!(task.modified_at, 1_700_000_000_000);
        assert_eq!(task.remote_identifier.as_deref(), Some("R1"));
    }

    #[test]
    fn keep_remote_re_decodes_current_notes() {
        let mut conflict = conflict();
        conflict.remote.notes = Some(encode_metadata(&Metadata {
            estimated_minutes: 60,
            remaining_minutes: 60,
            is_active: false,
            modified_at: 1_710_000_000_000,
        }));

        let effect = resolve(conflict, false, NOW);

        assert_eq!(effect.task().estimated_minutes, 60);
        assert_eq!(effect.task().remaining_minutes, 60);
        assert!(!effect.task().is_active);
    }

    #[test]
    fn skip_hands_conflict_back() {
        let conflict = conflict();
        let expected = conflict.clone();
        assert_eq!(
            resolve_with(conflict, ConflictDecision::Skip, NOW),
            Resolution::Unresolved(expected)
        );
    }

    #[test]
    fn decisions_map_to_effects() {
        assert!(matches!(
            resolve_with(conflict(), ConflictDecision::KeepLocal, NOW),
            Resolution::Resolved(ConflictEffect::PushLocal(_))
        ));
        assert!(matches!(
            resolve_with(conflict(), ConflictDecision::KeepRemote, NOW),
            Resolution::Resolved(ConflictEffect::OverwriteLocal(_))
        ));
    }
}
