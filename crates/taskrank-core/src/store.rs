//! Concurrent in-memory task store.
//!
//! The store is the single authoritative map from task id to [`Task`]. Readers
//! share an `RwLock`; writers take it exclusively. Nothing inside the lock does
//! I/O or awaits, so every hold is short.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::ValidationError;
use crate::task::Task;

#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store seeded with `tasks` (see [`TaskStore::replace_all`]).
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let store = Self::new();
        store.replace_all(tasks);
        store
    }

    // Every write is a single map operation, so a panic elsewhere cannot leave
    // the map half-updated; recover the guard instead of propagating poison.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Task>> {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Task>> {
        self.tasks.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or wholly replace the task with the same id.
    ///
    /// Returns the store size after the write.
    pub fn upsert(&self, task: Task) -> Result<usize, ValidationError> {
        if task.id.is_empty() {
            return Err(ValidationError::EmptyId);
        }
        let mut tasks = self.write();
        tasks.insert(task.id.clone(), task);
        Ok(tasks.len())
    }

    /// Remove a task if present. Returns the store size after the call.
    pub fn delete(&self, id: &str) -> usize {
        let mut tasks = self.write();
        tasks.remove(id);
        tasks.len()
    }

    /// Independent copy of every task, in no particular order.
    pub fn snapshot(&self) -> Vec<Task> {
        self.read().values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.read().get(id).cloned()
    }

    pub fn count(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Replace the whole content, e.g. with the persisted set at startup.
    ///
    /// Entries with an empty id are skipped; for duplicate ids the last one
    /// wins. Returns the number of tasks kept.
    pub fn replace_all(&self, tasks: Vec<Task>) -> usize {
        let fresh: HashMap<String, Task> = tasks
            .into_iter()
            .filter(|t| !t.id.is_empty())
            .map(|t| (t.id.clone(), t))
            .collect();
        let mut guard = self.write();
        *guard = fresh;
        guard.len()
    }
}
