//! Orchestration for `space-runner run`: dependency-first agent execution.
//!
//! Agents run strictly sequentially and depth-first. A shared visited set
//! breaks cycles and makes shared dependencies run at most once per top-level
//! invocation. Only a failure to load the top-level agent (or its runtime
//! context) is returned as an error; script failures, state write failures and
//! dependency failures are logged and surfaced as `onError` events.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{Value, json};
use tracing::{error, info, instrument, warn};

use crate::bus::EventBus;
use crate::core::context::RuntimeContext;
use crate::core::environment::agent_env;
use crate::core::state_update::{LeafClassifier, apply_state_keys, classify_state_leaf};
use crate::core::types::{Agent, LifecycleEvent};
use crate::io::agents::AgentRepository;
use crate::io::init::WorkspacePaths;
use crate::io::launcher::{ScriptLauncher, ScriptRequest};
use crate::io::state_store::{StateStore, now_timestamp};
use crate::io::workspace::WorkspaceLoader;

/// Options for a top-level run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Run declared dependencies (recursively) before the agent itself.
    pub with_deps: bool,
}

/// Result of a top-level run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub agent: String,
    /// Every agent started during this invocation.
    pub visited: BTreeSet<String>,
}

pub struct Engine {
    paths: WorkspacePaths,
    loader: WorkspaceLoader,
    repo: Arc<dyn AgentRepository>,
    launcher: Arc<dyn ScriptLauncher>,
    bus: Arc<EventBus>,
    classify: LeafClassifier,
}

impl Engine {
    pub fn new(
        loader: WorkspaceLoader,
        repo: Arc<dyn AgentRepository>,
        launcher: Arc<dyn ScriptLauncher>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            paths: loader.paths().clone(),
            loader,
            repo,
            launcher,
            bus,
            classify: classify_state_leaf,
        }
    }

    /// Replace the default state leaf classifier.
    pub fn with_leaf_classifier(mut self, classify: LeafClassifier) -> Self {
        self.classify = classify;
        self
    }

    /// Run `name` with a fresh visited set.
    ///
    /// On failure an `onError` event is emitted before the error is returned.
    pub fn run(&self, name: &str, options: RunOptions) -> Result<RunReport> {
        let mut visited = BTreeSet::new();
        if let Err(err) = self.run_agent(name, options, &mut visited) {
            self.bus.emit_lifecycle(
                LifecycleEvent::Error,
                &json!({"agent": name, "message": format!("{err:#}")}),
            );
            return Err(err);
        }
        Ok(RunReport {
            agent: name.to_string(),
            visited,
        })
    }

    /// Run one agent, sharing `visited` with the rest of the recursion tree.
    #[instrument(skip_all, fields(agent = name, with_deps = options.with_deps))]
    pub fn run_agent(
        &self,
        name: &str,
        options: RunOptions,
        visited: &mut BTreeSet<String>,
    ) -> Result<()> {
        if !visited.insert(name.to_string()) {
            return Ok(());
        }

        let agent = self
            .repo
            .load_agent(name)
            .map_err(|err| err.context(format!("load agent {name}")))?;
        let ctx = self
            .loader
            .build_context()
            .map_err(|err| err.context("build runtime context"))?;

        self.emit(LifecycleEvent::AgentStart, json!({"agent": agent.name}));
        info!(agent = %agent.name, version = %agent.version, "running agent");

        if options.with_deps {
            self.run_dependencies(&agent, options, visited);
        }

        match agent.script() {
            Some(runs) => self.run_script(&agent, runs, &ctx),
            None => info!(agent = %agent.name, "no external script"),
        }

        let keys = agent.state_keys();
        if !keys.is_empty() {
            self.update_state(&agent, keys);
        }

        self.emit(LifecycleEvent::AgentEnd, json!({"agent": agent.name}));
        info!(agent = %agent.name, "agent finished");
        Ok(())
    }

    fn run_dependencies(&self, agent: &Agent, options: RunOptions, visited: &mut BTreeSet<String>) {
        for dep in &agent.dependencies {
            info!(agent = %agent.name, dependency = %dep, "running dependency");
            self.emit(
                LifecycleEvent::AgentDependencyStart,
                json!({"agent": agent.name, "dependency": dep}),
            );
            if let Err(err) = self.run_agent(dep, options, visited) {
                let message = format!("{err:#}");
                error!(agent = %agent.name, dependency = %dep, err = %message, "dependency failed");
                self.emit(
                    LifecycleEvent::Error,
                    json!({"agent": dep, "message": message}),
                );
            }
            self.emit(
                LifecycleEvent::AgentDependencyEnd,
                json!({"agent": agent.name, "dependency": dep}),
            );
        }
    }

    fn run_script(&self, agent: &Agent, runs: &str, ctx: &RuntimeContext) {
        let script = self.paths.resolve_script(runs);
        let script_display = script.display().to_string();

        if !script.exists() {
            let message = format!("script not found: {script_display} (runs=\"{runs}\")");
            error!(agent = %agent.name, "{message}");
            self.emit(
                LifecycleEvent::Error,
                json!({"agent": agent.name, "message": message}),
            );
            return;
        }

        self.emit(
            LifecycleEvent::ScriptStart,
            json!({"agent": agent.name, "script": script_display}),
        );
        info!(agent = %agent.name, script = %script_display, "executing script");

        let request = ScriptRequest {
            script,
            workdir: self.paths.root.clone(),
            env: agent_env(ctx),
        };
        let result = self.launcher.run(&request);
        let status = result.as_ref().ok().and_then(|outcome| outcome.code);

        self.emit(
            LifecycleEvent::ScriptEnd,
            json!({"agent": agent.name, "script": script_display, "status": status}),
        );

        match result {
            Err(err) => {
                let message = format!("{err:#}");
                error!(agent = %agent.name, err = %message, "failed to execute script");
                self.emit(
                    LifecycleEvent::Error,
                    json!({"agent": agent.name, "message": message}),
                );
            }
            Ok(outcome) if outcome.timed_out => {
                error!(agent = %agent.name, "script timed out");
                self.emit(
                    LifecycleEvent::Error,
                    json!({"agent": agent.name, "message": "script timed out"}),
                );
            }
            Ok(outcome) if !outcome.success() => {
                error!(agent = %agent.name, status = ?outcome.code, "script exited with failure");
                self.emit(
                    LifecycleEvent::Error,
                    json!({"agent": agent.name, "status": outcome.code}),
                );
            }
            Ok(_) => {}
        }
    }

    fn update_state(&self, agent: &Agent, keys: &[String]) {
        let store = StateStore::new(&self.paths.state_path);
        let now = now_timestamp();
        let classify = self.classify;
        let result = store.update(|state| apply_state_keys(state, keys, classify, &now));

        match result {
            Ok(_) => {
                info!(agent = %agent.name, "state updated");
                self.emit(
                    LifecycleEvent::StateUpdate,
                    json!({"agent": agent.name, "stateKeys": keys}),
                );
            }
            Err(err) => {
                let message = format!("{err:#}");
                warn!(agent = %agent.name, err = %message, "state update failed");
                self.emit(
                    LifecycleEvent::Error,
                    json!({"agent": agent.name, "message": message}),
                );
            }
        }
    }

    fn emit(&self, event: LifecycleEvent, payload: Value) {
        self.bus.emit_lifecycle(event, &payload);
    }
}
