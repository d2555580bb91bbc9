use chrono::NaiveDateTime;

use crate::models::{NewTask, TaskId};
use crate::storage::KeyValueStore;
use crate::store::{StoreError, TaskStore};

/// Which screen the front end is presenting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Normal,
    Adding,
    Completed,
}

impl ViewMode {
    /// True when this mode lists the completed collection.
    pub fn shows_completed(self) -> bool {
        self == ViewMode::Completed
    }
}

/// Front-end state that sits beside the task store: the current mode and the
/// add form's draft.
#[derive(Debug, Default)]
pub struct ViewState {
    mode: ViewMode,
    pub draft: NewTask,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn viewing_completed(&self) -> bool {
        self.mode.shows_completed()
    }

    pub fn enter_create_mode<S: KeyValueStore>(&mut self, store: &mut TaskStore<S>) -> bool {
        self.transition(ViewMode::Adding, store)
    }

    /// Leave the add form without saving. The draft is kept for the next visit.
    pub fn exit_create_mode<S: KeyValueStore>(&mut self, store: &mut TaskStore<S>) -> bool {
        self.mode == ViewMode::Adding && self.transition(ViewMode::Normal, store)
    }

    /// Only offered while there is something to show.
    pub fn enter_completed_view<S: KeyValueStore>(&mut self, store: &mut TaskStore<S>) -> bool {
        if store.completed_tasks().is_empty() {
            return false;
        }
        self.transition(ViewMode::Completed, store)
    }

    pub fn exit_completed_view<S: KeyValueStore>(&mut self, store: &mut TaskStore<S>) -> bool {
        self.mode == ViewMode::Completed && self.transition(ViewMode::Normal, store)
    }

    /// Submit the draft. On success the draft is reset and the view returns to
    /// the active list; on a validation error the form stays open.
    ///
    /// Returns `Ok(None)` without touching the store unless the form is open.
    pub fn submit_draft<S: KeyValueStore>(
        &mut self,
        store: &mut TaskStore<S>,
        now: NaiveDateTime,
    ) -> Result<Option<TaskId>, StoreError> {
        if self.mode != ViewMode::Adding {
            return Ok(None);
        }
        let id = store.add(&self.draft, now)?;
        self.draft = NewTask::default();
        self.transition(ViewMode::Normal, store);
        Ok(Some(id))
    }

    /// Move to `to` if the state machine allows it. Any change of the listed
    /// collection drops the current selection.
    fn transition<S: KeyValueStore>(&mut self, to: ViewMode, store: &mut TaskStore<S>) -> bool {
        let allowed = matches!(
            (self.mode, to),
            (ViewMode::Normal, ViewMode::Adding)
                | (ViewMode::Normal, ViewMode::Completed)
                | (ViewMode::Adding, ViewMode::Normal)
                | (ViewMode::Completed, ViewMode::Normal)
        );
        if !allowed {
            return false;
        }

        if self.mode.shows_completed() != to.shows_completed() {
            store.clear_selection();
        }
        self.mode = to;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::task_ops::ValidationError;
    use chrono::{NaiveDate, NaiveTime};
    use pretty_assertions::assert_eq;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn store_with_completed() -> TaskStore<MemoryStorage> {
        let mut store = TaskStore::load(MemoryStorage::new());
        let candidate = NewTask::new(
            "done soon",
            NaiveDate::from_ymd_opt(2025, 3, 11).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        );
        let id = store.add(&candidate, now()).unwrap();
        store.toggle_status(id).unwrap();
        store
    }

    #[test]
    fn completed_view_needs_completed_tasks() {
        let mut store = TaskStore::load(MemoryStorage::new());
        let mut view = ViewState::new();
        assert!(!view.enter_completed_view(&mut store));
        assert_eq!(view.mode(), ViewMode::Normal);
    }

    #[test]
    fn adding_and_completed_are_not_directly_connected() {
        let mut store = store_with_completed();
        let mut view = ViewState::new();

        assert!(view.enter_create_mode(&mut store));
        assert!(!view.enter_completed_view(&mut store));
        assert_eq!(view.mode(), ViewMode::Adding);
        assert!(view.exit_create_mode(&mut store));
        assert!(view.enter_completed_view(&mut store));
        assert!(!view.enter_create_mode(&mut store));
        assert_eq!(view.mode(), ViewMode::Completed);
    }

    #[test]
    fn switching_collections_clears_selection() {
        let mut store = store_with_completed();
        let completed_id = store.completed_tasks()[0].id;
        let mut view = ViewState::new();

        store.toggle_selection(TaskId(1));
        assert!(view.enter_completed_view(&mut store));
        assert!(store.selected_ids().is_empty());

        store.toggle_selection(completed_id);
        assert!(view.exit_completed_view(&mut store));
        assert!(store.selected_ids().is_empty());
        assert!(!view.viewing_completed());
    }

    #[test]
    fn opening_the_form_keeps_selection() {
        let mut store = TaskStore::load(MemoryStorage::new());
        let mut view = ViewState::new();
        store.toggle_selection(TaskId(3));
        view.enter_create_mode(&mut store);
        assert_eq!(store.selected_ids().len(), 1);
    }

    #[test]
    fn invalid_draft_keeps_form_open() {
        let mut store = TaskStore::load(MemoryStorage::new());
        let mut view = ViewState::new();
        view.enter_create_mode(&mut store);
        view.draft.name = "No date yet".to_string();

        let err = view.submit_draft(&mut store, now()).unwrap_err();
        assert!(matches!(err, StoreError::Validation(ValidationError::DateRequired)));
        assert_eq!(view.mode(), ViewMode::Adding);
        assert_eq!(view.draft.name, "No date yet");
    }

    #[test]
    fn valid_draft_returns_to_list_and_resets() {
        let mut store = TaskStore::load(MemoryStorage::new());
        let mut view = ViewState::new();
        view.enter_create_mode(&mut store);
        view.draft = NewTask::new(
            "Standup",
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        );

        let id = view.submit_draft(&mut store, now()).unwrap().unwrap();
        assert_eq!(view.mode(), ViewMode::Normal);
        assert_eq!(view.draft, NewTask::default());
        assert_eq!(store.find(id).unwrap().start_time, "9:30 AM");
    }

    #[test]
    fn submit_outside_the_form_adds_nothing() {
        let mut store = store_with_completed();
        let mut view = ViewState::new();
        view.draft = NewTask::new(
            "Stray",
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        );

        assert_eq!(view.submit_draft(&mut store, now()).unwrap(), None);
        assert!(view.enter_completed_view(&mut store));
        assert_eq!(view.submit_draft(&mut store, now()).unwrap(), None);
        assert_eq!(view.mode(), ViewMode::Completed);
        assert!(store.active_tasks().is_empty());
        assert_eq!(view.draft.name, "Stray");
    }
}
