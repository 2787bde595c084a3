//! Agent definitions and the ecosystem registry.
//!
//! The [`AgentRepository`] trait decouples the engine and dispatcher from the
//! `.cursor/` filesystem layout. Nothing is cached: each call re-reads its
//! document so edits between calls are observed.

use anyhow::{Result, anyhow};
use tracing::debug;

use super::init::WorkspacePaths;
use super::json_file::read_json;
use crate::core::names::validate_agent_name;
use crate::core::types::{Agent, Ecosystem};

/// Read-only access to agent definitions keyed by name.
pub trait AgentRepository: Send + Sync {
    /// Load one agent definition.
    fn load_agent(&self, name: &str) -> Result<Agent>;

    /// Registered agent names, in ecosystem order.
    fn agent_names(&self) -> Result<Vec<String>>;
}

/// Repository backed by `.cursor/ecosystem.json` and `.cursor/agents/*.json`.
#[derive(Debug, Clone)]
pub struct FsAgentRepository {
    paths: WorkspacePaths,
}

impl FsAgentRepository {
    pub fn new(paths: WorkspacePaths) -> Self {
        Self { paths }
    }
}

impl AgentRepository for FsAgentRepository {
    fn load_agent(&self, name: &str) -> Result<Agent> {
        validate_agent_name(name).map_err(|err| anyhow!(err))?;
        let path = self.paths.agent_path(name);
        debug!(agent = name, path = %path.display(), "loading agent definition");
        let mut agent: Agent = read_json(&path)?;
        if agent.name.is_empty() {
            agent.name = name.to_string();
        }
        Ok(agent)
    }

    fn agent_names(&self) -> Result<Vec<String>> {
        let ecosystem: Ecosystem = read_json(&self.paths.ecosystem_path)?;
        Ok(ecosystem.agents)
    }
}
