//! Runtime context handed to every spawned script.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `.cursor/workspace.json`, after schema validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub name: String,
    pub branch: String,
    /// ISO-8601 creation timestamp.
    pub created: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    /// Fields this runner does not interpret, kept for `workspace-info`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Merged workspace, state, tool manifest and environment.
///
/// Built fresh before every agent run; never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeContext {
    pub workspace: Workspace,
    pub state: Value,
    /// Tool name to manifest metadata, in manifest order.
    pub tools: Map<String, Value>,
    /// Process environment overlaid with `workspace.env`.
    pub env: BTreeMap<String, String>,
}

impl RuntimeContext {
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }
}
