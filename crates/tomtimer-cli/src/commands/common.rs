use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tomtimer_core::models::SyncConflict;
use tomtimer_core::providers::JsonFileProvider;
use tomtimer_core::sync::{SyncOrchestrator, SyncReport};
use tomtimer_core::{Task, TaskService};

use crate::config_profiles::{CliProfile, CliProfilesConfig, ProviderKind};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct TaskListItem {
    pub id: String,
    pub title: String,
    pub estimated_minutes: u32,
    pub remaining_minutes: u32,
    pub is_active: bool,
    pub modified_at: i64,
    pub relative_time: String,
    pub remote_identifier: Option<String>,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("TOMTIMER_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tomtimer")
        .join("tomtimer.db")
}

pub fn open_tasks(path: &Path) -> Result<TaskService, CliError> {
    Ok(TaskService::open_path(path)?)
}

/// Load the profile named on the command line (or the active one)
pub fn load_profile(explicit: Option<&str>) -> Result<(String, Option<CliProfile>), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let name = config.resolve_profile_name(explicit);
    let profile = config.profile(&name).cloned();
    Ok((name, profile))
}

/// Build an orchestrator for a profile; the collection may still be unset
pub fn open_orchestrator(
    tasks: TaskService,
    profile: Option<&CliProfile>,
) -> Result<SyncOrchestrator<JsonFileProvider>, CliError> {
    let profile = profile.ok_or(CliError::SyncNotConfigured)?;
    let provider = match profile.provider {
        ProviderKind::JsonFile => {
            let store_path = profile
                .store_path
                .clone()
                .ok_or(CliError::SyncNotConfigured)?;
            JsonFileProvider::new(store_path)
        }
    };

    Ok(SyncOrchestrator::new(provider, tasks, profile.collection()))
}

pub async fn resolve_task(tasks: &TaskService, raw_id: &str) -> Result<Task, CliError> {
    let raw_id = normalize_task_identifier(raw_id)?;
    let id = match tasks.resolve_task_id(&raw_id).await {
        Ok(id) => id,
        Err(tomtimer_core::Error::NotFound(_)) => return Err(CliError::TaskNotFound(raw_id)),
        Err(error) => return Err(error.into()),
    };

    tasks
        .get_task(&id)
        .await?
        .ok_or(CliError::TaskNotFound(raw_id))
}

pub fn normalize_task_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyTaskId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn resolve_task_title(title_parts: &[String]) -> Result<String, CliError> {
    if let Some(title) = normalize_title(&title_parts.join(" ")) {
        return Ok(title);
    }

    if let Some(title) = read_piped_stdin()? {
        return Ok(title);
    }

    Err(CliError::EmptyTitle)
}

/// Collapse whitespace; titles are single-line
pub fn normalize_title(title: &str) -> Option<String> {
    let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_title(&buffer))
}

pub fn short_id(task: &Task) -> String {
    task.id.to_string().chars().take(13).collect()
}

pub fn title_preview(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        title.to_string()
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = title.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_task_lines(tasks: &[Task]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    tasks
        .iter()
        .map(|task| {
            let marker = if task.is_active { '*' } else { ' ' };
            let title = title_preview(&task.title, 40);
            let minutes = format!("{}/{} min", task.remaining_minutes, task.estimated_minutes);
            let relative_time = format_relative_time(task.modified_at, now_ms);
            let sync_state = if task.remote_identifier.is_some() {
                "synced"
            } else {
                "local"
            };
            format!(
                "{}  {marker} {title:<40}  {minutes:>13}  {relative_time:<10}  {sync_state}",
                short_id(task)
            )
        })
        .collect()
}

pub fn task_to_list_item(task: &Task) -> TaskListItem {
    let now_ms = Utc::now().timestamp_millis();
    TaskListItem {
        id: task.id.to_string(),
        title: task.title.clone(),
        estimated_minutes: task.estimated_minutes,
        remaining_minutes: task.remaining_minutes,
        is_active: task.is_active,
        modified_at: task.modified_at,
        relative_time: format_relative_time(task.modified_at, now_ms),
        remote_identifier: task.remote_identifier.clone(),
    }
}

pub fn format_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  local=\"{}\" {}/{} min  remote=\"{}\" {}/{} min",
                short_id(&conflict.task),
                title_preview(&conflict.local_title, 30),
                conflict.local_remaining,
                conflict.local_estimate,
                title_preview(&conflict.remote_title, 30),
                conflict.remote_remaining,
                conflict.remote_estimate
            )
        })
        .collect()
}

pub fn format_report_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Sync completed at {}: {} updated, {} created, {} deleted locally; {} pushed ({} newly linked)",
        format_sync_timestamp(report.finished_at),
        report.updated,
        report.created,
        report.deleted,
        report.pushed,
        report.linked
    )];

    if report.resolved > 0 {
        lines.push(format!("Resolved {} conflict(s)", report.resolved));
    }

    if !report.conflicts.is_empty() {
        lines.push(format!(
            "{} unresolved conflict(s); rerun with --resolve local|remote:",
            report.conflicts.len()
        ));
        lines.extend(format_conflict_lines(&report.conflicts));
    }

    for failure in &report.failures {
        lines.push(format!(
            "Failed to push \"{}\" ({}): {}",
            failure.title, failure.task_id, failure.reason
        ));
    }

    lines
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
