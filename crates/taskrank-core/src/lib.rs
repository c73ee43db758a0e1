//! # taskrank Core Library
//!
//! This library answers "what should I do next": it keeps a small set of user
//! tasks in memory, persists them to a JSON file, and ranks them against the
//! caller's free time and stress level. The `taskrank` binary is a thin CLI and
//! HTTP layer over the same library.
//!
//! ## Architecture
//!
//! - **Store**: concurrent id-to-task map serving independent snapshots
//! - **Storage**: atomic JSON persistence, a background saver, and TOML
//!   configuration
//! - **Ranking**: four bounded sub-scores combined with fixed weights, and a
//!   deterministic total order over the result
//! - **Service**: the facade request handlers share
//!
//! ## Key Components
//!
//! - [`TaskService`]: list, next, upsert, delete, explain
//! - [`RankingEngine`]: scoring and ordering
//! - [`TaskStore`]: in-memory state
//! - [`PersistenceGateway`] / [`PersistenceWorker`]: durability

pub mod context;
pub mod error;
pub mod ranking;
pub mod service;
pub mod storage;
pub mod store;
pub mod task;

pub use context::QueryContext;
pub use error::{ConfigError, CoreError, PersistenceError, ValidationError};
pub use ranking::{RankedTask, RankingEngine, RankingWeights, ScoreBreakdown};
pub use service::{MutationAck, TaskService};
pub use storage::{Config, PersistenceGateway, PersistenceWorker, SAVE_INTERVAL};
pub use store::TaskStore;
pub use task::{Deadline, Emotion, Task};
