mod config;
pub mod persistence;

pub use config::{Config, ServerConfig, StorageConfig};
pub use persistence::{PersistenceGateway, PersistenceWorker, SAVE_INTERVAL};

use std::path::PathBuf;

/// Returns `~/.config/taskrank[-dev]/` based on TASKRANK_ENV.
///
/// Set TASKRANK_ENV=dev to use a development data directory. The directory is
/// created on first save, not here.
pub fn data_dir() -> PathBuf {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TASKRANK_ENV").unwrap_or_else(|_| "production".to_string());

    if env == "dev" {
        base_dir.join("taskrank-dev")
    } else {
        base_dir.join("taskrank")
    }
}

/// Default task file, `<data dir>/tasks.json`.
pub fn default_data_file() -> PathBuf {
    data_dir().join("tasks.json")
}
