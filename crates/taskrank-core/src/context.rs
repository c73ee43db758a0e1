//! Situational parameters for a ranking call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free minutes assumed when the caller gives none (or zero).
pub const DEFAULT_FREE_MINUTES: i64 = 30;
/// Stress level assumed when the caller gives none (or zero).
pub const DEFAULT_STRESS_LEVEL: i64 = 3;

/// Per-request ranking context. Built for each query and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    /// Evaluation instant for deadline arithmetic
    pub now: DateTime<Utc>,
    /// Available time budget in minutes
    pub free_minutes: i64,
    /// Stress on an integer scale; 4 and above is "high", 2 and below is "calm"
    pub stress_level: i64,
}

impl QueryContext {
    /// Build a context, applying the defaults for missing or zero values.
    pub fn new(now: DateTime<Utc>, free_minutes: Option<i64>, stress_level: Option<i64>) -> Self {
        Self {
            now,
            free_minutes: non_zero_or(free_minutes, DEFAULT_FREE_MINUTES),
            stress_level: non_zero_or(stress_level, DEFAULT_STRESS_LEVEL),
        }
    }

    /// Build a context evaluated at the current wall-clock time.
    pub fn now(free_minutes: Option<i64>, stress_level: Option<i64>) -> Self {
        Self::new(Utc::now(), free_minutes, stress_level)
    }

    pub fn is_stressed(&self) -> bool {
        self.stress_level >= 4
    }

    pub fn is_calm(&self) -> bool {
        self.stress_level <= 2
    }
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::now(None, None)
    }
}

fn non_zero_or(value: Option<i64>, fallback: i64) -> i64 {
    match value {
        Some(0) | None => fallback,
        Some(v) => v,
    }
}
