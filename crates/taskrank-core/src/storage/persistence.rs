//! Durable storage of the full task set.
//!
//! [`PersistenceGateway`] reads and writes the JSON file. Writes go to a
//! sibling `*.tmp` file which is then renamed over the primary, so a crash
//! never leaves a half-written primary behind.
//!
//! [`PersistenceWorker`] is the background task that keeps the file current:
//! it saves whenever the mutation signal fires, on a fixed interval as a
//! safety net, and once more when it is shut down.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::PersistenceError;
use crate::store::TaskStore;
use crate::task::Task;

/// Background save cadence.
pub const SAVE_INTERVAL: Duration = Duration::from_secs(30);

/// File-backed save/load of the task set.
#[derive(Debug, Clone)]
pub struct PersistenceGateway {
    path: PathBuf,
}

impl PersistenceGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("tasks.json"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Read the persisted set.
    ///
    /// `Ok(None)` when the file does not exist.
    pub fn try_load(&self) -> Result<Option<Vec<Task>>, PersistenceError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let tasks = serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Decode {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(tasks))
    }

    /// Read the persisted set, treating a missing or unreadable file as empty.
    pub fn load(&self) -> Vec<Task> {
        match self.try_load() {
            Ok(Some(tasks)) => {
                info!(path = %self.path.display(), count = tasks.len(), "loaded tasks");
                tasks
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "no task file yet, starting empty");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "could not load task file, starting empty");
                Vec::new()
            }
        }
    }

    /// Write the whole set atomically. Tasks are written sorted by id.
    pub fn save(&self, tasks: &[Task]) -> Result<(), PersistenceError> {
        let mut ordered: Vec<&Task> = tasks.iter().collect();
        ordered.sort_by(|a, b| a.id.cmp(&b.id));
        let content = serde_json::to_vec_pretty(&ordered).map_err(PersistenceError::Encode)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| PersistenceError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let tmp = self.temp_path();
        fs::write(&tmp, content).map_err(|source| PersistenceError::Write {
            path: tmp.clone(),
            source,
        })?;
        if let Err(source) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(PersistenceError::Rename {
                path: self.path.clone(),
                source,
            });
        }
        Ok(())
    }
}

/// Snapshot the store and save it off the async threads.
///
/// Returns whether the write succeeded; failures are logged and left for the
/// next trigger.
pub async fn persist_snapshot(
    store: &TaskStore,
    gateway: &Arc<PersistenceGateway>,
    reason: &'static str,
) -> bool {
    let tasks = store.snapshot();
    let count = tasks.len();
    let gateway = Arc::clone(gateway);
    match tokio::task::spawn_blocking(move || gateway.save(&tasks)).await {
        Ok(Ok(())) => {
            debug!(count, reason, "saved tasks");
            true
        }
        Ok(Err(e)) => {
            warn!(error = %e, reason, "failed to save tasks");
            false
        }
        Err(e) => {
            warn!(error = %e, reason, "save task did not complete");
            false
        }
    }
}

/// Handle to the background persistence task.
pub struct PersistenceWorker {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PersistenceWorker {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(
        store: Arc<TaskStore>,
        gateway: Arc<PersistenceGateway>,
        signal: Arc<Notify>,
        interval: Duration,
    ) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        persist_snapshot(&store, &gateway, "interval").await;
                    }
                    _ = signal.notified() => {
                        persist_snapshot(&store, &gateway, "mutation").await;
                    }
                    // also fires when the handle is dropped
                    _ = stopped.changed() => break,
                }
            }

            persist_snapshot(&store, &gateway, "shutdown").await;
            debug!("persistence worker stopped");
        });
        Self { stop, handle }
    }

    /// Stop the worker after one final save.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "persistence worker ended abnormally");
        }
    }
}
