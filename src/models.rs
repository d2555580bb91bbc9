use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque task identifier. Serialized as a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Incomplete,
    Complete,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Incomplete => write!(f, "Incomplete"),
            TaskStatus::Complete => write!(f, "Complete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub start_date: NaiveDate,
    pub start_time: String, // display form: H:MM AM|PM
    pub status: TaskStatus,
}

impl Task {
    pub fn is_complete(&self) -> bool {
        self.status == TaskStatus::Complete
    }
}

/// Fields gathered by the add form before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
}

impl NewTask {
    pub fn new(name: impl Into<String>, start_date: NaiveDate, start_time: NaiveTime) -> Self {
        Self {
            name: name.into(),
            start_date: Some(start_date),
            start_time: Some(start_time),
        }
    }
}

/// Partial edit of an active task. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.start_date.is_none() && self.start_time.is_none()
    }
}
