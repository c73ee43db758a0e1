//! Service facade over the store, the ranking engine and persistence.
//!
//! One [`TaskService`] is built at startup and shared by handle with every
//! request handler. Mutations go to the store and then wake the persistence
//! worker through a [`Notify`]; ranking reads a snapshot and scores it
//! without holding any lock.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::info;

use crate::context::QueryContext;
use crate::error::{CoreError, Result};
use crate::ranking::{RankedTask, RankingEngine, ScoreBreakdown};
use crate::storage::{PersistenceGateway, PersistenceWorker};
use crate::store::TaskStore;
use crate::task::Task;

/// Acknowledgement returned by every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationAck {
    pub ok: bool,
    /// Store size after the mutation
    pub count: usize,
}

impl MutationAck {
    fn new(count: usize) -> Self {
        Self { ok: true, count }
    }
}

#[derive(Debug, Default)]
pub struct TaskService {
    store: Arc<TaskStore>,
    engine: RankingEngine,
    save_signal: Arc<Notify>,
}

impl TaskService {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self {
            store,
            engine: RankingEngine::new(),
            save_signal: Arc::new(Notify::new()),
        }
    }

    /// Build a service seeded from the persisted file. Never fails: a missing
    /// or unreadable file yields an empty store.
    pub fn open(gateway: &PersistenceGateway) -> Self {
        let store = TaskStore::with_tasks(gateway.load());
        Self::new(Arc::new(store))
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn engine(&self) -> &RankingEngine {
        &self.engine
    }

    /// Start the background saver for this service's store.
    pub fn spawn_persistence(
        &self,
        gateway: Arc<PersistenceGateway>,
        interval: Duration,
    ) -> PersistenceWorker {
        PersistenceWorker::spawn(
            Arc::clone(&self.store),
            gateway,
            Arc::clone(&self.save_signal),
            interval,
        )
    }

    /// Write the current store to `gateway` right away, bypassing the worker.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Persistence`] when the file cannot be written.
    pub fn save_to(&self, gateway: &PersistenceGateway) -> Result<()> {
        gateway.save(&self.store.snapshot())?;
        Ok(())
    }

    /// Insert or replace a task.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTask`] when the id is empty.
    pub fn upsert_task(&self, task: Task) -> Result<MutationAck> {
        let id = task.id.clone();
        let count = self.store.upsert(task)?;
        info!(task_id = %id, count, "task upserted");
        self.save_signal.notify_one();
        Ok(MutationAck::new(count))
    }

    /// Remove a task; succeeds whether or not it existed.
    pub fn delete_task(&self, id: &str) -> MutationAck {
        let count = self.store.delete(id);
        info!(task_id = %id, count, "task deleted");
        self.save_signal.notify_one();
        MutationAck::new(count)
    }

    pub fn get_task(&self, id: &str) -> Option<Task> {
        self.store.get(id)
    }

    /// Unranked snapshot.
    pub fn tasks(&self) -> Vec<Task> {
        self.store.snapshot()
    }

    pub fn count(&self) -> usize {
        self.store.count()
    }

    /// Every task with its score, in listing order.
    pub fn ranked(&self, ctx: &QueryContext) -> Vec<RankedTask> {
        self.engine.rank(self.store.snapshot(), ctx)
    }

    /// Every task in listing order.
    pub fn list_tasks(&self, ctx: &QueryContext) -> Vec<Task> {
        self.engine.order(self.store.snapshot(), ctx)
    }

    /// The single best task, or `None` when the store is empty.
    pub fn next_task(&self, ctx: &QueryContext) -> Option<Task> {
        self.engine
            .best(self.store.snapshot(), ctx)
            .map(|ranked| ranked.task)
    }

    /// Explain one task's score.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for an unknown id.
    pub fn explain(&self, id: &str, ctx: &QueryContext) -> Result<ScoreBreakdown> {
        let task = self
            .store
            .get(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        Ok(self.engine.breakdown(&task, ctx))
    }
}
