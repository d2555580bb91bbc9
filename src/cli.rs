use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use thiserror::Error;

use crate::models::{NewTask, Task, TaskId, TaskPatch};
use crate::storage::KeyValueStore;
use crate::store::{Confirm, StoreError, TaskStore};
use crate::utils::{parse_date, parse_time};

#[derive(Parser)]
#[command(name = "tdl")]
#[command(about = "A single-list to-do manager")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/storage)
    #[arg(long)]
    pub dev: bool,

    /// Skip delete confirmation prompts
    #[arg(short, long)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Add a new task
    Add {
        /// Task name
        name: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long, value_parser = date_arg)]
        date: Option<chrono::NaiveDate>,
        /// Start time, 24-hour (HH:MM)
        #[arg(long, value_parser = time_arg)]
        time: Option<chrono::NaiveTime>,
    },
    /// List tasks in chronological order
    List {
        /// Show completed tasks instead of active ones
        #[arg(long)]
        completed: bool,
    },
    /// Edit an active task
    Edit {
        id: u64,
        #[arg(long)]
        name: Option<String>,
        /// Start date (YYYY-MM-DD)
        #[arg(long, value_parser = date_arg)]
        date: Option<chrono::NaiveDate>,
        /// Start time, 24-hour (HH:MM)
        #[arg(long, value_parser = time_arg)]
        time: Option<chrono::NaiveTime>,
    },
    /// Mark an active task complete
    Toggle { id: u64 },
    /// Mark several active tasks complete
    Complete {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Delete one or more tasks
    Delete {
        #[arg(required = true)]
        ids: Vec<u64>,
        /// Delete from the completed list
        #[arg(long)]
        completed: bool,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    StoreError(#[from] StoreError),
    #[error("Failed to write output: {0}")]
    IoError(#[from] io::Error),
}

fn date_arg(value: &str) -> Result<chrono::NaiveDate, String> {
    parse_date(value).map_err(|e| format!("Invalid date format '{}': {}", value, e))
}

fn time_arg(value: &str) -> Result<chrono::NaiveTime, String> {
    parse_time(value).map_err(|e| format!("Invalid time format '{}': {}", value, e))
}

/// Ask a yes/no question on stdin. Anything but `y`/`yes` declines.
pub fn prompt_confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Run one command against the store, writing user-facing output to `out`.
pub fn run<S: KeyValueStore>(
    command: Commands,
    store: &mut TaskStore<S>,
    now: chrono::NaiveDateTime,
    confirm: &mut impl Confirm,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match command {
        Commands::Add { name, date, time } => handle_add(name, date, time, store, now, out),
        Commands::List { completed } => handle_list(completed, store, out),
        Commands::Edit {
            id,
            name,
            date,
            time,
        } => {
            let patch = TaskPatch {
                name,
                start_date: date,
                start_time: time,
            };
            handle_edit(TaskId(id), &patch, store, out)
        }
        Commands::Toggle { id } => handle_toggle(TaskId(id), store, out),
        Commands::Complete { ids } => handle_complete(&ids, store, out),
        Commands::Delete { ids, completed } => handle_delete(&ids, completed, store, confirm, out),
    }
}

/// Handle the add command
pub fn handle_add<S: KeyValueStore>(
    name: String,
    date: Option<chrono::NaiveDate>,
    time: Option<chrono::NaiveTime>,
    store: &mut TaskStore<S>,
    now: chrono::NaiveDateTime,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let candidate = NewTask {
        name,
        start_date: date,
        start_time: time,
    };
    let id = store.add(&candidate, now)?;
    writeln!(out, "Task created successfully (ID: {})", id)?;
    Ok(())
}

/// Handle the list command
pub fn handle_list<S: KeyValueStore>(
    completed: bool,
    store: &TaskStore<S>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let tasks = if completed {
        store.sorted_completed()
    } else {
        store.sorted_active()
    };

    if tasks.is_empty() {
        let label = if completed { "completed" } else { "active" };
        writeln!(out, "No {} tasks.", label)?;
        return Ok(());
    }

    let name_width = tasks
        .iter()
        .map(|t| t.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Task".len());
    writeln!(
        out,
        "{:<15}  {:<name_width$}  {:<10}  {:<10}  {}",
        "ID", "Task", "Status", "Start Time", "Start Date"
    )?;
    for task in tasks {
        write_row(out, task, name_width)?;
    }
    Ok(())
}

fn write_row(out: &mut impl Write, task: &Task, name_width: usize) -> io::Result<()> {
    writeln!(
        out,
        "{:<15}  {:<name_width$}  {:<10}  {:<10}  {}",
        task.id.to_string(),
        task.name,
        task.status.to_string(),
        task.start_time,
        task.start_date.format("%Y-%m-%d")
    )
}

/// Handle the edit command
pub fn handle_edit<S: KeyValueStore>(
    id: TaskId,
    patch: &TaskPatch,
    store: &mut TaskStore<S>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    if patch.is_empty() {
        writeln!(out, "Nothing to change.")?;
        return Ok(());
    }
    if store.update_fields(id, patch)? {
        writeln!(out, "Task {} updated", id)?;
    } else {
        writeln!(out, "No active task with ID {}", id)?;
    }
    Ok(())
}

/// Handle the toggle command
pub fn handle_toggle<S: KeyValueStore>(
    id: TaskId,
    store: &mut TaskStore<S>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    if store.toggle_status(id)? {
        writeln!(out, "Task marked as complete")?;
    } else {
        writeln!(out, "No active task with ID {}", id)?;
    }
    Ok(())
}

/// Handle the complete command. Ids go through the selection set like a
/// checked-box bulk action.
pub fn handle_complete<S: KeyValueStore>(
    ids: &[u64],
    store: &mut TaskStore<S>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    store.clear_selection();
    for &id in ids {
        if !store.selected_ids().contains(&TaskId(id)) {
            store.toggle_selection(TaskId(id));
        }
    }
    let moved = store.complete_selected()?;
    writeln!(out, "{} task(s) marked as complete", moved)?;
    Ok(())
}

/// Handle the delete command
pub fn handle_delete<S: KeyValueStore>(
    ids: &[u64],
    completed: bool,
    store: &mut TaskStore<S>,
    confirm: &mut impl Confirm,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let removed = if let [id] = ids {
        store.delete_one(TaskId(*id), completed, confirm)?
    } else {
        store.clear_selection();
        for &id in ids {
            if !store.selected_ids().contains(&TaskId(id)) {
                store.toggle_selection(TaskId(id));
            }
        }
        store.delete_selected(completed, confirm)?
    };

    writeln!(out, "{} task(s) deleted", removed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_add_command() {
        let cli = Cli::try_parse_from([
            "tdl", "add", "Dentist", "--date", "2025-03-12", "--time", "14:30",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Commands::Add {
                name: "Dentist".to_string(),
                date: NaiveDate::from_ymd_opt(2025, 3, 12),
                time: NaiveTime::from_hms_opt(14, 30, 0),
            }
        );
        assert!(!cli.yes);
    }

    #[test]
    fn add_fields_are_optional_at_parse_time() {
        let cli = Cli::try_parse_from(["tdl", "add", ""]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Add {
                name: String::new(),
                date: None,
                time: None,
            }
        );
    }

    #[test]
    fn rejects_malformed_time() {
        assert!(Cli::try_parse_from(["tdl", "add", "x", "--time", "2pm"]).is_err());
    }

    #[test]
    fn parses_bulk_delete() {
        let cli = Cli::try_parse_from(["tdl", "--yes", "delete", "1", "2", "--completed"]).unwrap();
        assert!(cli.yes);
        assert_eq!(
            cli.command,
            Commands::Delete {
                ids: vec![1, 2],
                completed: true,
            }
        );
        assert!(Cli::try_parse_from(["tdl", "delete"]).is_err());
    }
}
