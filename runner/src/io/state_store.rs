//! State document storage (`.cursor/state.json`).
//!
//! Every call re-reads the file. There is no locking: concurrent runners
//! against the same workspace race and the last writer wins.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use super::json_file::{read_json_or, write_json};
use crate::core::state_update::default_state;

/// Current UTC time as ISO-8601 with millisecond precision (`...T12:00:00.000Z`).
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state document, defaulting when the file is absent.
    pub fn load(&self) -> Result<Value> {
        debug!(path = %self.path.display(), "loading state");
        let state: Value = read_json_or(&self.path, default_state)?;
        if !state.is_object() {
            return Err(anyhow!(
                "state document {} must be a JSON object",
                self.path.display()
            ));
        }
        Ok(state)
    }

    pub fn save(&self, state: &Value) -> Result<()> {
        debug!(path = %self.path.display(), "writing state");
        write_json(&self.path, state)
    }

    /// Load, mutate and persist the state document in one step.
    pub fn update<F>(&self, mutate: F) -> Result<Value>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let mut state = self.load()?;
        if let Value::Object(map) = &mut state {
            mutate(map);
        }
        self.save(&state)?;
        Ok(state)
    }
}
