//! The task store: active and completed collections, the bulk-selection set,
//! and the only writer to persistent storage.

use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{NewTask, Task, TaskId, TaskPatch, TaskStatus};
use crate::storage::{ACTIVE_KEY, COMPLETED_KEY, KeyValueStore, StorageError};
use crate::task_ops::{self, ValidationError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Failed to serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Asks the user to approve a destructive operation.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Hands out ids strictly greater than any id issued or loaded so far.
#[derive(Debug, Default)]
struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    fn observe(&mut self, id: TaskId) {
        self.last = self.last.max(id.0);
    }

    /// `None` once the id space above `last` is used up.
    fn next(&mut self, millis: u64) -> Option<TaskId> {
        let id = millis.max(self.last.checked_add(1)?);
        self.last = id;
        Some(TaskId(id))
    }
}

pub struct TaskStore<S> {
    storage: S,
    active: Vec<Task>,
    completed: Vec<Task>,
    selected: BTreeSet<TaskId>,
    ids: IdGenerator,
}

impl<S: KeyValueStore> TaskStore<S> {
    /// Load both collections from `storage`.
    ///
    /// Absent or malformed entries start out empty. Loaded tasks are sorted
    /// into the collection matching their status, and an id seen twice keeps
    /// only its first occurrence.
    pub fn load(storage: S) -> Self {
        let stored_active = read_collection(&storage, ACTIVE_KEY);
        let stored_completed = read_collection(&storage, COMPLETED_KEY);

        let mut store = Self {
            storage,
            active: Vec::new(),
            completed: Vec::new(),
            selected: BTreeSet::new(),
            ids: IdGenerator::default(),
        };

        let mut seen = HashSet::new();
        for task in stored_active {
            if !seen.insert(task.id) {
                warn!(id = %task.id, "dropping duplicate task id from storage");
                continue;
            }
            store.ids.observe(task.id);
            if task.is_complete() {
                store.completed.push(task);
            } else {
                store.active.push(task);
            }
        }
        for mut task in stored_completed {
            if !seen.insert(task.id) {
                warn!(id = %task.id, "dropping duplicate task id from storage");
                continue;
            }
            store.ids.observe(task.id);
            task.status = TaskStatus::Complete;
            store.completed.push(task);
        }

        debug!(
            active = store.active.len(),
            completed = store.completed.len(),
            "loaded task store"
        );
        store
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Active tasks in insertion order.
    pub fn active_tasks(&self) -> &[Task] {
        &self.active
    }

    /// Completed tasks in completion order.
    pub fn completed_tasks(&self) -> &[Task] {
        &self.completed
    }

    pub fn selected_ids(&self) -> &BTreeSet<TaskId> {
        &self.selected
    }

    pub fn sorted_active(&self) -> Vec<&Task> {
        task_ops::sorted(&self.active)
    }

    pub fn sorted_completed(&self) -> Vec<&Task> {
        task_ops::sorted(&self.completed)
    }

    /// Look a task up in either collection.
    pub fn find(&self, id: TaskId) -> Option<&Task> {
        self.active
            .iter()
            .chain(self.completed.iter())
            .find(|t| t.id == id)
    }

    /// Validate and append a new active task. Nothing changes on a validation error.
    pub fn add(&mut self, candidate: &NewTask, now: NaiveDateTime) -> Result<TaskId, StoreError> {
        task_ops::validate_new_task(candidate, now)?;
        let (Some(start_date), Some(start_time)) = (candidate.start_date, candidate.start_time)
        else {
            // validation guarantees both are present
            return Err(ValidationError::DateRequired.into());
        };

        let millis = u64::try_from(now.and_utc().timestamp_millis()).unwrap_or_default();
        let id = match self.ids.next(millis) {
            Some(id) => id,
            None => self.lowest_free_id(),
        };
        self.active.push(Task {
            id,
            name: candidate.name.trim().to_string(),
            start_date,
            start_time: task_ops::display_time(start_time),
            status: TaskStatus::Incomplete,
        });
        self.persist_active()?;

        debug!(%id, "added task");
        Ok(id)
    }

    /// Edit an active task in place. Returns `false` if no active task has `id`.
    ///
    /// A blank name in the patch is ignored so a task never loses its name.
    pub fn update_fields(&mut self, id: TaskId, patch: &TaskPatch) -> Result<bool, StoreError> {
        let Some(task) = self.active.iter_mut().find(|t| t.id == id) else {
            debug!(%id, "update ignored: no active task");
            return Ok(false);
        };

        if let Some(name) = patch.name.as_deref().map(str::trim) {
            if !name.is_empty() {
                task.name = name.to_string();
            }
        }
        if let Some(date) = patch.start_date {
            task.start_date = date;
        }
        if let Some(time) = patch.start_time {
            task.start_time = task_ops::display_time(time);
        }
        self.persist_active()?;

        debug!(%id, "updated task");
        Ok(true)
    }

    /// Mark an active task complete and move it to the completed collection.
    ///
    /// Completed tasks never move back; an id that is not active is ignored.
    pub fn toggle_status(&mut self, id: TaskId) -> Result<bool, StoreError> {
        let Some(index) = self.active.iter().position(|t| t.id == id) else {
            debug!(%id, "toggle ignored: no active task");
            return Ok(false);
        };

        let mut task = self.active.remove(index);
        task.status = TaskStatus::Complete;
        self.completed.push(task);
        self.selected.remove(&id);
        self.persist_all()?;

        debug!(%id, "completed task");
        Ok(true)
    }

    /// Delete one task from the viewed collection after `confirm` approves.
    ///
    /// Returns the number of tasks removed; a declined prompt removes nothing.
    pub fn delete_one(
        &mut self,
        id: TaskId,
        viewing_completed: bool,
        confirm: &mut impl Confirm,
    ) -> Result<usize, StoreError> {
        if !confirm.confirm("Are you sure you want to delete this task?") {
            debug!(%id, "delete declined");
            return Ok(0);
        }

        let removed = self.remove_from(&BTreeSet::from([id]), viewing_completed)?;
        self.selected.remove(&id);
        Ok(removed)
    }

    /// Delete every listed task from the viewed collection in one write, then
    /// clear the selection. A declined prompt changes nothing.
    pub fn bulk_delete(
        &mut self,
        ids: impl IntoIterator<Item = TaskId>,
        viewing_completed: bool,
        confirm: &mut impl Confirm,
    ) -> Result<usize, StoreError> {
        let ids: BTreeSet<TaskId> = ids.into_iter().collect();
        let prompt = format!(
            "Are you sure you want to delete {} selected task(s)?",
            ids.len()
        );
        if !confirm.confirm(&prompt) {
            debug!(count = ids.len(), "bulk delete declined");
            return Ok(0);
        }

        let removed = self.remove_from(&ids, viewing_completed)?;
        self.selected.clear();
        Ok(removed)
    }

    /// Move every listed active task to the completed collection, then clear
    /// the selection. Returns the number of tasks moved.
    pub fn bulk_complete(
        &mut self,
        ids: impl IntoIterator<Item = TaskId>,
    ) -> Result<usize, StoreError> {
        let ids: BTreeSet<TaskId> = ids.into_iter().collect();
        let (done, keep): (Vec<Task>, Vec<Task>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|t| ids.contains(&t.id));
        self.active = keep;

        let moved = done.len();
        self.completed.extend(done.into_iter().map(|mut task| {
            task.status = TaskStatus::Complete;
            task
        }));
        self.selected.clear();

        if moved > 0 {
            self.persist_all()?;
        }
        debug!(moved, "bulk completed tasks");
        Ok(moved)
    }

    /// Flip `id` in or out of the selection. Returns whether it is now selected.
    pub fn toggle_selection(&mut self, id: TaskId) -> bool {
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn complete_selected(&mut self) -> Result<usize, StoreError> {
        let ids = self.selected.clone();
        self.bulk_complete(ids)
    }

    pub fn delete_selected(
        &mut self,
        viewing_completed: bool,
        confirm: &mut impl Confirm,
    ) -> Result<usize, StoreError> {
        let ids = self.selected.clone();
        self.bulk_delete(ids, viewing_completed, confirm)
    }

    fn remove_from(
        &mut self,
        ids: &BTreeSet<TaskId>,
        viewing_completed: bool,
    ) -> Result<usize, StoreError> {
        let collection = if viewing_completed {
            &mut self.completed
        } else {
            &mut self.active
        };
        let before = collection.len();
        collection.retain(|t| !ids.contains(&t.id));
        let removed = before - collection.len();

        if removed > 0 {
            if viewing_completed {
                self.persist_completed()?;
            } else {
                self.persist_active()?;
            }
        }
        debug!(removed, viewing_completed, "deleted tasks");
        Ok(removed)
    }

    fn lowest_free_id(&self) -> TaskId {
        let used: HashSet<TaskId> = self
            .active
            .iter()
            .chain(self.completed.iter())
            .map(|t| t.id)
            .collect();
        let mut candidate = 0;
        while used.contains(&TaskId(candidate)) {
            candidate += 1;
        }
        warn!(id = candidate, "id space exhausted, reusing lowest free id");
        TaskId(candidate)
    }

    fn persist_active(&mut self) -> Result<(), StoreError> {
        let json = serde_json::to_string(&self.active)?;
        self.storage.write(ACTIVE_KEY, &json)?;
        Ok(())
    }

    fn persist_completed(&mut self) -> Result<(), StoreError> {
        let json = serde_json::to_string(&self.completed)?;
        self.storage.write(COMPLETED_KEY, &json)?;
        Ok(())
    }

    fn persist_all(&mut self) -> Result<(), StoreError> {
        self.persist_active()?;
        self.persist_completed()
    }
}

fn read_collection<S: KeyValueStore>(storage: &S, key: &str) -> Vec<Task> {
    let raw = match storage.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(key, error = %e, "failed to read stored tasks, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(tasks) => tasks,
        Err(e) => {
            warn!(key, error = %e, "ignoring malformed stored tasks");
            Vec::new()
        }
    }
}
