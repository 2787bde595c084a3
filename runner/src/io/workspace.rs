//! Workspace loader: merges workspace metadata, state and the tool manifest
//! into a [`RuntimeContext`].

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::validator_for;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{instrument, warn};

use super::git::Git;
use super::init::WorkspacePaths;
use super::json_file::{read_json, read_json_or};
use super::state_store::StateStore;
use crate::core::context::{RuntimeContext, Workspace};

const WORKSPACE_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/workspace.schema.json"
));

#[derive(Debug, Default, Deserialize)]
struct ToolManifest {
    #[serde(default)]
    tools: Map<String, Value>,
}

/// Final path component of `root` after canonicalization.
pub fn folder_name(root: &Path) -> Option<String> {
    let resolved = root.canonicalize().ok()?;
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Load and schema-validate `.cursor/workspace.json`. The file is required.
pub fn load_workspace(path: &Path) -> Result<Workspace> {
    let value: Value = read_json(path)?;
    validate_workspace(&value).with_context(|| format!("invalid {}", path.display()))?;
    serde_json::from_value(value).with_context(|| format!("deserialize {}", path.display()))
}

fn validate_workspace(instance: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(WORKSPACE_SCHEMA).context("parse workspace schema")?;
    let compiled =
        validator_for(&schema).map_err(|err| anyhow!("invalid workspace schema: {err}"))?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("workspace validation failed:\n- {}", messages.join("\n- "));
    }
    Ok(())
}

/// Builds a fresh [`RuntimeContext`] on every call.
#[derive(Debug, Clone)]
pub struct WorkspaceLoader {
    paths: WorkspacePaths,
    base_env: Option<BTreeMap<String, String>>,
}

impl WorkspaceLoader {
    pub fn new(paths: WorkspacePaths) -> Self {
        Self {
            paths,
            base_env: None,
        }
    }

    /// Use `env` instead of the process environment as the base of
    /// [`RuntimeContext::env`].
    pub fn with_base_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.base_env = Some(env);
        self
    }

    pub fn paths(&self) -> &WorkspacePaths {
        &self.paths
    }

    #[instrument(skip_all)]
    pub fn build_context(&self) -> Result<RuntimeContext> {
        let workspace = load_workspace(&self.paths.workspace_path)?;
        let state = StateStore::new(&self.paths.state_path).load()?;
        let manifest: ToolManifest =
            read_json_or(&self.paths.tool_manifest_path, ToolManifest::default)?;

        self.warn_on_mismatch(&workspace);

        let mut env = match &self.base_env {
            Some(env) => env.clone(),
            None => std::env::vars().collect(),
        };
        env.extend(
            workspace
                .env
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );

        Ok(RuntimeContext {
            workspace,
            state,
            tools: manifest.tools,
            env,
        })
    }

    fn warn_on_mismatch(&self, workspace: &Workspace) {
        if let Some(folder) = folder_name(&self.paths.root)
            && folder != workspace.name
        {
            warn!(
                workspace = %workspace.name,
                folder = %folder,
                "workspace.name does not match current folder"
            );
        }
        if let Some(branch) = Git::new(&self.paths.root).current_branch_lenient()
            && branch != workspace.branch
        {
            warn!(
                workspace = %workspace.branch,
                git = %branch,
                "workspace.branch does not match git branch"
            );
        }
    }
}
