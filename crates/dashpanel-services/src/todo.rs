//! Persisted to-do list.
//!
//! Every mutation is applied to a copy, written through the store, and only
//! then committed in memory. A failed write leaves the list as it was.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashpanel_core::store::{get_as, set_as, KEY_TODO};
use dashpanel_core::{KeyValueStore, StoreError};
use serde::{Deserialize, Serialize};

use crate::error::{ListError, ListResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoTask {
    pub text: String,
    #[serde(default)]
    pub done: bool,
    /// Stored as epoch milliseconds
    #[serde(rename = "created", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl TodoTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
            created_at: Utc::now(),
        }
    }
}

/// A task as listed, with its position in the full list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleTask<'a> {
    pub index: usize,
    pub task: &'a TodoTask,
}

pub struct TodoList {
    store: Arc<dyn KeyValueStore>,
    tasks: Vec<TodoTask>,
}

impl TodoList {
    /// Load the list, starting empty when nothing (or nothing readable) is stored.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let tasks = match get_as::<Vec<TodoTask>>(store.as_ref(), KEY_TODO) {
            Ok(tasks) => tasks.unwrap_or_default(),
            Err(e @ StoreError::Shape { .. }) => {
                tracing::warn!("Discarding unreadable to-do list: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        tracing::debug!("Loaded {} to-do items", tasks.len());
        Ok(Self { store, tasks })
    }

    pub fn tasks(&self) -> &[TodoTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.done).count()
    }

    /// Tasks to display. Completed tasks are hidden unless `show_completed`.
    pub fn visible(&self, show_completed: bool) -> Vec<VisibleTask<'_>> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| show_completed || !task.done)
            .map(|(index, task)| VisibleTask { index, task })
            .collect()
    }

    /// Add a task at the top of the list.
    pub fn add(&mut self, text: &str) -> ListResult<&TodoTask> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ListError::validation("task text is empty"));
        }

        self.commit(|tasks| {
            tasks.insert(0, TodoTask::new(text));
            Ok(())
        })?;
        Ok(&self.tasks[0])
    }

    /// Flip a task's done flag; returns the new value.
    pub fn toggle(&mut self, index: usize) -> ListResult<bool> {
        self.check_index(index)?;
        let done = !self.tasks[index].done;
        self.commit(|tasks| {
            tasks[index].done = done;
            Ok(())
        })?;
        Ok(done)
    }

    pub fn delete(&mut self, index: usize) -> ListResult<TodoTask> {
        self.check_index(index)?;
        let removed = self.tasks[index].clone();
        self.commit(|tasks| {
            tasks.remove(index);
            Ok(())
        })?;
        Ok(removed)
    }

    /// Move the task at `from` so that it ends up at `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> ListResult<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }

        self.commit(|tasks| {
            let moved = tasks.remove(from);
            tasks.insert(to, moved);
            Ok(())
        })
    }

    /// Remove every completed task; returns how many were removed.
    pub fn clear_completed(&mut self) -> ListResult<usize> {
        let before = self.tasks.len();
        self.commit(|tasks| {
            tasks.retain(|t| !t.done);
            Ok(())
        })?;
        Ok(before - self.tasks.len())
    }

    fn check_index(&self, index: usize) -> ListResult<()> {
        if index < self.tasks.len() {
            Ok(())
        } else {
            Err(ListError::OutOfRange {
                index,
                len: self.tasks.len(),
            })
        }
    }

    fn commit<F>(&mut self, change: F) -> ListResult<()>
    where
        F: FnOnce(&mut Vec<TodoTask>) -> ListResult<()>,
    {
        let mut next = self.tasks.clone();
        change(&mut next)?;
        set_as(self.store.as_ref(), KEY_TODO, &next)?;
        self.tasks = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashpanel_core::store::StoreResult;
    use dashpanel_core::MemoryStore;
    use serde_json::Value;

    fn list() -> (Arc<MemoryStore>, TodoList) {
        let store = Arc::new(MemoryStore::new());
        let list = TodoList::load(store.clone()).unwrap();
        (store, list)
    }

    fn stored_texts(store: &MemoryStore) -> Vec<String> {
        get_as::<Vec<TodoTask>>(store, KEY_TODO)
            .unwrap()
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_add_trims_and_inserts_at_front() {
        let (store, mut list) = list();
        list.add("first").unwrap();
        list.add("  second  ").unwrap();

        assert_eq!(list.tasks()[0].text, "second");
        assert_eq!(stored_texts(&store), vec!["second", "first"]);
    }

    #[test]
    fn test_add_rejects_blank() {
        let (store, mut list) = list();
        let err = list.add("   ").unwrap_err();
        assert!(matches!(err, ListError::Validation(_)));
        assert!(list.is_empty());
        assert_eq!(store.get(KEY_TODO).unwrap(), None);
    }

    #[test]
    fn test_toggle_and_active_count() {
        let (store, mut list) = list();
        list.add("a").unwrap();
        list.add("b").unwrap();

        assert!(list.toggle(1).unwrap());
        assert_eq!(list.active_count(), 1);

        let reloaded = TodoList::load(store).unwrap();
        assert!(reloaded.tasks()[1].done);
        assert_eq!(reloaded.active_count(), 1);
    }

    #[test]
    fn test_visible_keeps_real_indices() {
        let (_store, mut list) = list();
        for text in ["c", "b", "a"] {
            list.add(text).unwrap();
        }
        list.toggle(1).unwrap();

        let active: Vec<(usize, &str)> = list
            .visible(false)
            .iter()
            .map(|v| (v.index, v.task.text.as_str()))
            .collect();
        assert_eq!(active, vec![(0, "a"), (2, "c")]);
        assert_eq!(list.visible(true).len(), 3);
    }

    #[test]
    fn test_reorder_delete_and_clear_completed() {
        let (store, mut list) = list();
        for text in ["c", "b", "a"] {
            list.add(text).unwrap();
        }

        list.reorder(0, 2).unwrap();
        assert_eq!(stored_texts(&store), vec!["b", "c", "a"]);

        let removed = list.delete(1).unwrap();
        assert_eq!(removed.text, "c");
        assert_eq!(stored_texts(&store), vec!["b", "a"]);

        list.toggle(0).unwrap();
        assert_eq!(list.clear_completed().unwrap(), 1);
        assert_eq!(stored_texts(&store), vec!["a"]);
    }

    #[test]
    fn test_out_of_range() {
        let (_store, mut list) = list();
        list.add("only").unwrap();
        assert!(matches!(
            list.toggle(3),
            Err(ListError::OutOfRange { index: 3, len: 1 })
        ));
        assert!(list.reorder(0, 1).is_err());
    }

    #[test]
    fn test_created_is_epoch_millis() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                KEY_TODO,
                serde_json::json!([{"text": "legacy", "done": true, "created": 1760538600000_i64}]),
            )
            .unwrap();

        let list = TodoList::load(store.clone()).unwrap();
        assert_eq!(list.tasks()[0].created_at.timestamp_millis(), 1_760_538_600_000);

        let mut list = list;
        list.add("new").unwrap();
        let raw = store.get(KEY_TODO).unwrap().unwrap();
        assert!(raw[1]["created"].is_i64());
    }

    #[test]
    fn test_unreadable_list_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(KEY_TODO, Value::String("garbage".into())).unwrap();

        let list = TodoList::load(store).unwrap();
        assert!(list.is_empty());
    }

    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> StoreResult<Option<Value>> {
            self.0.get(key)
        }

        fn set(&self, _key: &str, _value: Value) -> StoreResult<()> {
            Err(StoreError::Write("read-only".into()))
        }

        fn remove(&self, _key: &str) -> StoreResult<()> {
            Err(StoreError::Write("read-only".into()))
        }
    }

    #[test]
    fn test_failed_write_leaves_list_unchanged() {
        let store = Arc::new(ReadOnlyStore(MemoryStore::new()));
        let mut list = TodoList::load(store).unwrap();

        let err = list.add("lost").unwrap_err();
        assert!(matches!(err, ListError::Store(StoreError::Write(_))));
        assert!(list.is_empty());
    }
}
