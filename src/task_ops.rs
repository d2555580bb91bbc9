//! Pure task helpers: add-form validation, 12-hour time formatting and the
//! chronological ordering used for every list view.

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use std::cmp::Ordering;
use thiserror::Error;

use crate::models::{NewTask, Task};

/// Reasons a new task is rejected. The messages are shown to the user verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Task name is required.")]
    NameRequired,
    #[error("Task date is required.")]
    DateRequired,
    #[error("Task time is required.")]
    TimeRequired,
    #[error("You can't select a past date.")]
    PastDate,
    #[error("You can't select a past time for today.")]
    PastTime,
}

/// Format a 24-hour `HH:MM` string as `H:MM AM|PM`.
///
/// Empty input yields an empty string. Input that is not a 24-hour time is
/// returned as-is (trimmed).
pub fn format_time(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    match NaiveTime::parse_from_str(raw, "%H:%M") {
        Ok(time) => display_time(time),
        Err(_) => raw.to_string(),
    }
}

/// Display form of a time of day. Midnight and noon both render with hour 12.
pub fn display_time(time: NaiveTime) -> String {
    let (is_pm, hour) = time.hour12();
    let period = if is_pm { "PM" } else { "AM" };
    format!("{}:{:02} {}", hour, time.minute(), period)
}

/// Minutes since midnight for a stored `H:MM AM|PM` time.
pub fn time_to_minutes(display: &str) -> Option<u32> {
    let (clock, period) = display.trim().split_once(' ')?;
    let (hour, minute) = clock.split_once(':')?;
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    if !(1..=12).contains(&hour) || minute >= 60 {
        return None;
    }

    let offset = match period.trim() {
        "AM" => 0,
        "PM" => 720,
        _ => return None,
    };
    Some(hour % 12 * 60 + minute + offset)
}

/// Check a candidate task against `now`. The first failing rule wins.
pub fn validate_new_task(candidate: &NewTask, now: NaiveDateTime) -> Result<(), ValidationError> {
    if candidate.name.trim().is_empty() {
        return Err(ValidationError::NameRequired);
    }
    let date = candidate.start_date.ok_or(ValidationError::DateRequired)?;
    let time = candidate.start_time.ok_or(ValidationError::TimeRequired)?;

    let today = now.date();
    if date < today {
        return Err(ValidationError::PastDate);
    }
    if date == today && date.and_time(time) < now {
        return Err(ValidationError::PastTime);
    }

    Ok(())
}

/// Order by start date, then by start time of day.
///
/// Times that cannot be parsed sort before every parsable time on the same date.
pub fn compare_by_start_then_time(a: &Task, b: &Task) -> Ordering {
    a.start_date
        .cmp(&b.start_date)
        .then_with(|| time_to_minutes(&a.start_time).cmp(&time_to_minutes(&b.start_time)))
}

/// Borrowing view of `tasks` in chronological order. The slice itself is left untouched.
pub fn sorted(tasks: &[Task]) -> Vec<&Task> {
    let mut view: Vec<&Task> = tasks.iter().collect();
    view.sort_by(|a, b| compare_by_start_then_time(a, b));
    view
}
