use std::path::Path;

use crate::commands::common::{format_task_lines, open_tasks, task_to_list_item, TaskListItem};
use crate::error::CliError;

pub async fn run_list(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let tasks = open_tasks(db_path)?.list_tasks().await?;

    if as_json {
        let json_items = tasks
            .iter()
            .map(task_to_list_item)
            .collect::<Vec<TaskListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if tasks.is_empty() {
        println!("No tasks yet. Add one with `tomtimer add <title>`.");
    } else {
        for line in format_task_lines(&tasks) {
            println!("{line}");
        }
    }

    Ok(())
}
