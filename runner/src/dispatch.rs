//! Listener-agent dispatch.
//!
//! Installed as the bus's listener-agent runner. For every emitted event it
//! scans the ecosystem in registry order and fires the script of each agent
//! whose `listens` contains the event name. Listener scripts are detached:
//! stdio is discarded, the dispatcher never waits on them, and nothing they do
//! can fail the emitting run.

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::bus::EventBus;
use crate::core::environment::listener_env;
use crate::core::types::Agent;
use crate::io::agents::AgentRepository;
use crate::io::launcher::{ScriptLauncher, ScriptRequest};
use crate::io::workspace::WorkspaceLoader;

pub struct ListenerDispatcher {
    loader: WorkspaceLoader,
    repo: Arc<dyn AgentRepository>,
    launcher: Arc<dyn ScriptLauncher>,
}

impl ListenerDispatcher {
    pub fn new(
        loader: WorkspaceLoader,
        repo: Arc<dyn AgentRepository>,
        launcher: Arc<dyn ScriptLauncher>,
    ) -> Self {
        Self {
            loader,
            repo,
            launcher,
        }
    }

    /// Install this dispatcher as `bus`'s listener-agent runner, replacing
    /// any previous runner.
    pub fn install(self: Arc<Self>, bus: &EventBus) {
        bus.set_agent_listener_runner(Arc::new(move |event, payload| {
            self.dispatch(event, payload);
            Ok(())
        }));
    }

    /// Fire every listener for `event`. Returns the names of the agents whose
    /// scripts were spawned. Never fails.
    #[instrument(skip_all, fields(event))]
    pub fn dispatch(&self, event: &str, payload: &Value) -> Vec<String> {
        let names = match self.repo.agent_names() {
            Ok(names) => names,
            Err(err) => {
                debug!(err = %format!("{err:#}"), "ecosystem unavailable, skipping listeners");
                return Vec::new();
            }
        };

        let mut fired = Vec::new();
        for name in names {
            let Ok(agent) = self.repo.load_agent(&name) else {
                continue;
            };
            if !agent.listens_to(event) {
                continue;
            }
            match self.fire(&agent, event, payload) {
                Ok(true) => fired.push(agent.name),
                Ok(false) => {}
                Err(err) => warn!(
                    agent = %agent.name,
                    event,
                    err = %format!("{err:#}"),
                    "listener agent failed"
                ),
            }
        }
        fired
    }

    fn fire(&self, agent: &Agent, event: &str, payload: &Value) -> Result<bool> {
        let Some(runs) = agent.script() else {
            return Ok(false);
        };
        let paths = self.loader.paths();
        let script = paths.resolve_script(runs);
        if !script.exists() {
            return Ok(false);
        }

        let ctx = self.loader.build_context()?;
        let request = ScriptRequest {
            script,
            workdir: paths.root.clone(),
            env: listener_env(&ctx, event, payload),
        };
        self.launcher.spawn_detached(&request)?;
        debug!(agent = %agent.name, event, "listener spawned");
        Ok(true)
    }
}
