//! Task model.
//!
//! A [`Task`] is the unit of work the ranking engine orders. Its JSON form uses
//! camelCase field names and is shared by the HTTP API and the persisted file.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Subjective feel of performing a task.
///
/// Tags other than the three known ones decode as [`Emotion::Unknown`] and keep
/// their raw text, so they survive a save/load round trip and contribute
/// nothing to the emotional-affinity score.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum Emotion {
    Pleasant,
    Neutral,
    Aversive,
    Unknown(String),
}

impl Emotion {
    /// Parse a tag. Matching is exact, like the wire format.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "PLEASANT" => Emotion::Pleasant,
            "NEUTRAL" => Emotion::Neutral,
            "AVERSIVE" => Emotion::Aversive,
            other => Emotion::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Emotion::Pleasant => "PLEASANT",
            Emotion::Neutral => "NEUTRAL",
            Emotion::Aversive => "AVERSIVE",
            Emotion::Unknown(raw) => raw,
        }
    }
}

impl Default for Emotion {
    fn default() -> Self {
        Emotion::Unknown(String::new())
    }
}

impl From<Option<String>> for Emotion {
    fn from(tag: Option<String>) -> Self {
        tag.map(|t| Emotion::from_tag(&t)).unwrap_or_default()
    }
}

impl From<Emotion> for String {
    fn from(emotion: Emotion) -> Self {
        emotion.as_str().to_string()
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of interpreting a task's `dueAt` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deadline {
    /// No deadline was given.
    None,
    /// A parseable RFC 3339 deadline.
    At(DateTime<Utc>),
    /// A value was given but does not parse; ranks as if absent.
    Malformed(String),
}

impl Deadline {
    /// The instant, when there is a usable one.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Deadline::At(at) => Some(*at),
            Deadline::None | Deadline::Malformed(_) => None,
        }
    }
}

/// Interpret a raw `dueAt` value.
pub fn parse_deadline(raw: Option<&str>) -> Deadline {
    let Some(raw) = raw else {
        return Deadline::None;
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(at) => Deadline::At(at.with_timezone(&Utc)),
        Err(_) => Deadline::Malformed(raw.to_string()),
    }
}

/// Decode `null` as the type's zero value, like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A user task.
///
/// Missing or `null` JSON fields take zero values, so an incomplete payload
/// still decodes and is then judged by the store (an empty id is rejected
/// there).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    /// Unique, caller-supplied identifier
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    /// Free-text label
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    pub emotion: Emotion,
    /// Effort estimate in minutes
    #[serde(deserialize_with = "null_as_default")]
    pub minutes_needed: i64,
    /// Caller-asserted priority, nominally 1..=5
    #[serde(deserialize_with = "null_as_default")]
    pub importance: i64,
    /// RFC 3339 deadline, kept verbatim
    pub due_at: Option<String>,
}

impl Task {
    /// Create a neutral, half-hour, mid-importance task without a deadline.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            emotion: Emotion::Neutral,
            minutes_needed: 30,
            importance: 3,
            due_at: None,
        }
    }

    pub fn with_emotion(mut self, emotion: Emotion) -> Self {
        self.emotion = emotion;
        self
    }

    pub fn with_minutes(mut self, minutes: i64) -> Self {
        self.minutes_needed = minutes;
        self
    }

    pub fn with_importance(mut self, importance: i64) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_due(mut self, due: DateTime<Utc>) -> Self {
        self.due_at = Some(due.to_rfc3339_opts(SecondsFormat::Secs, true));
        self
    }

    /// Set `dueAt` verbatim, without checking that it parses.
    pub fn with_due_raw(mut self, raw: impl Into<String>) -> Self {
        self.due_at = Some(raw.into());
        self
    }

    pub fn deadline(&self) -> Deadline {
        parse_deadline(self.due_at.as_deref())
    }
}
