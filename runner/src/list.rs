//! Orchestration for `space-runner list`.

use std::fmt;

use anyhow::{Context, Result};

use crate::core::types::Agent;
use crate::io::agents::AgentRepository;

/// One line of `list` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentListing {
    Loaded(Agent),
    Failed { name: String, error: String },
}

impl fmt::Display for AgentListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded(agent) => write!(
                f,
                " - {} v{} :: {}",
                agent.name, agent.version, agent.description
            ),
            Self::Failed { name, error } => write!(f, " - {name} (failed to load: {error})"),
        }
    }
}

/// Load every registered agent. A missing or malformed ecosystem is an error;
/// a broken definition becomes an [`AgentListing::Failed`] entry.
pub fn list_agents(repo: &dyn AgentRepository) -> Result<Vec<AgentListing>> {
    let names = repo.agent_names().context("load ecosystem")?;
    Ok(names
        .into_iter()
        .map(|name| match repo.load_agent(&name) {
            Ok(agent) => AgentListing::Loaded(agent),
            Err(err) => AgentListing::Failed {
                name,
                error: format!("{err:#}"),
            },
        })
        .collect())
}
