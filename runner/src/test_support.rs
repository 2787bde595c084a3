//! Test-only helpers: temp workspaces, a recording launcher and an event log.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::bus::{EventBus, handler};
use crate::core::types::{Ecosystem, LifecycleEvent};
use crate::dispatch::ListenerDispatcher;
use crate::engine::Engine;
use crate::io::agents::FsAgentRepository;
use crate::io::init::WorkspacePaths;
use crate::io::json_file::{read_json, write_json};
use crate::io::launcher::{ScriptLauncher, ScriptRequest};
use crate::io::process::ProcessOutcome;
use crate::io::state_store::StateStore;
use crate::io::workspace::{WorkspaceLoader, folder_name};

const ALL_EVENTS: [LifecycleEvent; 9] = [
    LifecycleEvent::AgentStart,
    LifecycleEvent::AgentDependencyStart,
    LifecycleEvent::AgentDependencyEnd,
    LifecycleEvent::ScriptStart,
    LifecycleEvent::ScriptEnd,
    LifecycleEvent::StateUpdate,
    LifecycleEvent::AgentEnd,
    LifecycleEvent::Error,
    LifecycleEvent::WorkspaceContextReady,
];

/// A temporary workspace with `.cursor/workspace.json` and an empty ecosystem.
///
/// `state.json` is not written until something updates state.
pub struct TestWorkspace {
    temp: TempDir,
    paths: WorkspacePaths,
    name: String,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir()?;
        let paths = WorkspacePaths::new(temp.path());
        let name = folder_name(temp.path()).ok_or_else(|| anyhow!("temp dir has no name"))?;
        fs::create_dir_all(&paths.agents_dir)?;
        write_json(
            &paths.workspace_path,
            &json!({
                "name": name,
                "branch": "main",
                "created": "2026-01-01T00:00:00.000Z"
            }),
        )?;
        write_json(&paths.ecosystem_path, &Ecosystem::default())?;
        Ok(Self { temp, paths, name })
    }

    pub fn root(&self) -> PathBuf {
        self.temp.path().to_path_buf()
    }

    pub fn paths(&self) -> &WorkspacePaths {
        &self.paths
    }

    /// Workspace name (the temp folder's name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append `name` to the ecosystem if it is not registered yet.
    pub fn register(&self, name: &str) -> Result<()> {
        let mut ecosystem: Ecosystem = read_json(&self.paths.ecosystem_path)?;
        if !ecosystem.agents.iter().any(|existing| existing == name) {
            ecosystem.agents.push(name.to_string());
        }
        write_json(&self.paths.ecosystem_path, &ecosystem)
    }

    /// Write a raw agent definition and register it.
    pub fn agent_json(&self, name: &str, definition: Value) -> Result<()> {
        write_json(&self.paths.agent_path(name), &definition)?;
        self.register(name)
    }

    /// Write a simple agent. When `runs` is set, a passing script is created
    /// at that path relative to the root.
    pub fn agent(&self, name: &str, dependencies: &[&str], runs: Option<&str>) -> Result<()> {
        let mut definition = json!({
            "name": name,
            "version": "1.0.0",
            "description": format!("{name} agent"),
            "dependencies": dependencies,
        });
        if let Some(runs) = runs {
            definition["runs"] = json!(runs);
            self.script(runs, "#!/bin/sh\nexit 0\n")?;
        }
        self.agent_json(name, definition)
    }

    /// Write an executable script relative to the root and return its path.
    pub fn script(&self, rel: &str, body: &str) -> Result<PathBuf> {
        let path = self.temp.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, body)?;
        make_executable(&path)?;
        Ok(path)
    }

    pub fn state(&self) -> Result<Value> {
        StateStore::new(&self.paths.state_path).load()
    }

    pub fn repository(&self) -> FsAgentRepository {
        FsAgentRepository::new(self.paths.clone())
    }

    /// Loader with an empty base environment, for deterministic contexts.
    pub fn loader(&self) -> WorkspaceLoader {
        WorkspaceLoader::new(self.paths.clone()).with_base_env(BTreeMap::new())
    }

    pub fn engine(&self, launcher: Arc<dyn ScriptLauncher>, bus: Arc<EventBus>) -> Engine {
        Engine::new(self.loader(), Arc::new(self.repository()), launcher, bus)
    }

    pub fn dispatcher(&self, launcher: Arc<dyn ScriptLauncher>) -> Arc<ListenerDispatcher> {
        Arc::new(ListenerDispatcher::new(
            self.loader(),
            Arc::new(self.repository()),
            launcher,
        ))
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Launcher that records requests instead of spawning processes.
///
/// Scripts exit 0 unless configured otherwise; scripts are matched by file name.
#[derive(Default)]
pub struct RecordingLauncher {
    exit_codes: HashMap<String, i32>,
    fail_to_start: BTreeSet<String>,
    runs: Mutex<Vec<ScriptRequest>>,
    detached: Mutex<Vec<ScriptRequest>>,
}

impl RecordingLauncher {
    pub fn exiting(mut self, script: &str, code: i32) -> Self {
        self.exit_codes.insert(script.to_string(), code);
        self
    }

    pub fn failing_to_start(mut self, script: &str) -> Self {
        self.fail_to_start.insert(script.to_string());
        self
    }

    /// Blocking runs, in order.
    pub fn runs(&self) -> Vec<ScriptRequest> {
        self.runs.lock().expect("runs lock").clone()
    }

    /// Detached spawns, in order.
    pub fn detached(&self) -> Vec<ScriptRequest> {
        self.detached.lock().expect("detached lock").clone()
    }

    pub fn run_names(&self) -> Vec<String> {
        self.runs().iter().map(file_name).collect()
    }

    pub fn detached_names(&self) -> Vec<String> {
        self.detached().iter().map(file_name).collect()
    }

    fn check_start(&self, request: &ScriptRequest) -> Result<String> {
        let name = file_name(request);
        if self.fail_to_start.contains(&name) {
            return Err(anyhow!("spawn {name}: permission denied"));
        }
        Ok(name)
    }
}

impl ScriptLauncher for RecordingLauncher {
    fn run(&self, request: &ScriptRequest) -> Result<ProcessOutcome> {
        let name = self.check_start(request)?;
        self.runs.lock().expect("runs lock").push(request.clone());
        let code = self.exit_codes.get(&name).copied().unwrap_or(0);
        Ok(ProcessOutcome::exited(code))
    }

    fn spawn_detached(&self, request: &ScriptRequest) -> Result<()> {
        self.check_start(request)?;
        self.detached
            .lock()
            .expect("detached lock")
            .push(request.clone());
        Ok(())
    }
}

fn file_name(request: &ScriptRequest) -> String {
    request
        .script
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Records every lifecycle event emitted on a bus, in order.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<(String, Value)>>>,
}

impl EventLog {
    /// Subscribe to every [`LifecycleEvent`] on `bus`.
    pub fn attach(bus: &EventBus) -> Self {
        let log = Self::default();
        let events = log.events.clone();
        let record = handler(move |payload, event| {
            events
                .lock()
                .map_err(|_| anyhow!("event log poisoned"))?
                .push((event.to_string(), payload.clone()));
            Ok(())
        });
        for event in ALL_EVENTS {
            bus.subscribe(event.as_str(), record.clone());
        }
        log
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().expect("events lock").clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|(name, _)| name).collect()
    }

    pub fn payloads(&self, event: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|(name, _)| name == event)
            .map(|(_, payload)| payload)
            .collect()
    }
}
