//! Run state and the checkpoint store built on it.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::dates::{format_bookmark, parse_timestamp};
use crate::error::{Result, TapError};
use crate::sink::MessageSink;

/// Bookmark key holding a stream's cursor.
pub const START_DATE_KEY: &str = "start_date";

/// Progress of one stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamBookmark {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Keys written by other tools, carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `{stream_id: {start_date: "..."}}`, persisted after every step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunState(BTreeMap<String, StreamBookmark>);

impl RunState {
    /// Interprets a state document.
    ///
    /// Accepts the Singer `{"bookmarks": {...}}` wrapper and skips top-level
    /// entries that are not objects. Stream entries next to the wrapper are
    /// merged in; the wrapper wins for streams present in both.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut top) = value else {
            return Err(TapError::configuration("State must be a JSON object"));
        };
        if let Some(Value::Object(bookmarks)) = top.remove("bookmarks") {
            for (stream, entry) in bookmarks {
                if top.insert(stream.clone(), entry).is_some() {
                    warn!(key = %stream, "Bookmark inside 'bookmarks' overrides top-level entry");
                }
            }
        }

        let mut state = BTreeMap::new();
        for (stream, entry) in top {
            if !entry.is_object() {
                warn!(key = %stream, "Ignoring non-object state entry");
                continue;
            }
            let bookmark: StreamBookmark = serde_json::from_value(entry).map_err(|e| {
                TapError::configuration(format!("Invalid bookmark for '{stream}': {e}"))
            })?;
            state.insert(stream, bookmark);
        }
        Ok(Self(state))
    }

    /// Loads a state file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TapError::configuration(format!("Cannot read state file '{}': {e}", path.display()))
        })?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_str(&raw).map_err(|e| {
            TapError::configuration(format!("State file '{}' is not valid JSON: {e}", path.display()))
        })?;
        let state = Self::from_value(value)?;
        debug!(path = %path.display(), streams = state.0.len(), "Loaded run state");
        Ok(state)
    }

    pub fn bookmark(&self, stream: &str) -> Option<&str> {
        self.0.get(stream)?.start_date.as_deref()
    }

    pub fn set_bookmark(&mut self, stream: &str, value: impl Into<String>) {
        self.0.entry(stream.to_string()).or_default().start_date = Some(value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Holds the cursor of every stream and writes it through to the sink.
///
/// Only the sync engine mutates it.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    state: RunState,
    fallback_start: DateTime<Utc>,
}

impl CheckpointStore {
    pub fn new(state: RunState, fallback_start: DateTime<Utc>) -> Self {
        Self {
            state,
            fallback_start,
        }
    }

    /// The stream's cursor, or the configured start date if none is stored.
    pub fn get(&self, stream: &str) -> Result<DateTime<Utc>> {
        match self.state.bookmark(stream) {
            Some(bookmark) => parse_timestamp(bookmark),
            None => Ok(self.fallback_start),
        }
    }

    /// Restates a cursor in memory without flushing.
    pub fn record(&mut self, stream: &str, cursor: &DateTime<Utc>) {
        self.state.set_bookmark(stream, format_bookmark(cursor));
    }

    /// Moves the cursor forward and makes it durable before returning.
    #[instrument(skip(self, sink), fields(stream = %stream, cursor = %format_bookmark(cursor)))]
    pub fn advance<S: MessageSink + ?Sized>(
        &mut self,
        stream: &str,
        cursor: &DateTime<Utc>,
        sink: &mut S,
    ) -> Result<()> {
        let current = self.get(stream)?;
        if *cursor < current {
            return Err(TapError::Internal(format!(
                "refusing to move '{stream}' checkpoint back from {} to {}",
                format_bookmark(&current),
                format_bookmark(cursor)
            )));
        }
        self.record(stream, cursor);
        self.flush(sink)?;
        debug!("Checkpoint advanced");
        Ok(())
    }

    /// Emits the full state and flushes the sink.
    pub fn flush<S: MessageSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        sink.write_state(&self.state)
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }
}
