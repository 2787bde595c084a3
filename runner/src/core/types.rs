//! Shared deterministic types for the agent engine.
//!
//! These mirror the on-disk documents under `.cursor/`. Agent definitions are
//! duck-typed: every optional field defaults to absent/empty instead of failing
//! deserialization.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A named unit of automation loaded from `.cursor/agents/<name>.json`.
///
/// Fields holding `null` or a value of the wrong type read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Agent {
    #[serde(deserialize_with = "lenient")]
    pub name: String,
    #[serde(deserialize_with = "lenient")]
    pub version: String,
    #[serde(deserialize_with = "lenient")]
    pub description: String,
    /// Script to execute, relative to the workspace root. `None` means no-op.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub runs: Option<String>,
    /// Agents that must run (recursively) before this one, in declared order.
    #[serde(deserialize_with = "string_list")]
    pub dependencies: Vec<String>,
    /// Event names that trigger this agent's script as a listener.
    #[serde(deserialize_with = "string_list")]
    pub listens: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub output: Option<OutputSpec>,
}

impl Agent {
    /// The `runs` path, treating a blank value as no script.
    pub fn script(&self) -> Option<&str> {
        self.runs
            .as_deref()
            .filter(|runs| !runs.trim().is_empty())
    }

    pub fn listens_to(&self, event: &str) -> bool {
        self.listens.iter().any(|name| name == event)
    }

    /// State keys to mutate after a run, or an empty slice when the agent
    /// does not declare state updates.
    pub fn state_keys(&self) -> &[String] {
        match &self.output {
            Some(output) if output.updates_state => &output.state_keys,
            _ => &[],
        }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Arrays keep their string entries; anything else is empty.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

/// Declared state effects of an agent run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputSpec {
    pub updates_state: bool,
    /// Dotted paths into the state document, e.g. `flags.initialized`.
    pub state_keys: Vec<String>,
}

/// `.cursor/ecosystem.json`: the registry of known agent names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ecosystem {
    pub agents: Vec<String>,
}

/// Lifecycle events emitted by the engine.
///
/// The bus is keyed by plain strings so callers may emit arbitrary events;
/// these are the names the engine itself produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    AgentStart,
    AgentDependencyStart,
    AgentDependencyEnd,
    ScriptStart,
    ScriptEnd,
    StateUpdate,
    AgentEnd,
    Error,
    WorkspaceContextReady,
}

impl LifecycleEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AgentStart => "onAgentStart",
            Self::AgentDependencyStart => "onAgentDependencyStart",
            Self::AgentDependencyEnd => "onAgentDependencyEnd",
            Self::ScriptStart => "onScriptStart",
            Self::ScriptEnd => "onScriptEnd",
            Self::StateUpdate => "onStateUpdate",
            Self::AgentEnd => "onAgentEnd",
            Self::Error => "onError",
            Self::WorkspaceContextReady => "onWorkspaceContextReady",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
