//! `.cursor/` layout and scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::config::{RunnerConfig, write_config};
use super::git::Git;
use super::json_file::write_json;
use super::state_store::now_timestamp;
use super::workspace::folder_name;
use crate::core::state_update::default_state;
use crate::core::types::Ecosystem;

/// All canonical paths within `.cursor/` for a workspace root.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub cursor_dir: PathBuf,
    pub agents_dir: PathBuf,
    pub tools_dir: PathBuf,
    pub ecosystem_path: PathBuf,
    pub state_path: PathBuf,
    pub workspace_path: PathBuf,
    pub tool_manifest_path: PathBuf,
    pub config_path: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let cursor_dir = root.join(".cursor");
        let agents_dir = cursor_dir.join("agents");
        let tools_dir = cursor_dir.join("tools");
        Self {
            root: root.clone(),
            cursor_dir: cursor_dir.clone(),
            agents_dir: agents_dir.clone(),
            tools_dir: tools_dir.clone(),
            ecosystem_path: cursor_dir.join("ecosystem.json"),
            state_path: cursor_dir.join("state.json"),
            workspace_path: cursor_dir.join("workspace.json"),
            tool_manifest_path: tools_dir.join("manifest.json"),
            config_path: cursor_dir.join("runner.toml"),
        }
    }

    /// Definition file for `name`. Callers validate the name first.
    pub fn agent_path(&self, name: &str) -> PathBuf {
        self.agents_dir.join(format!("{name}.json"))
    }

    /// Resolve an agent's `runs` value against the workspace root.
    /// Absolute paths are kept as-is.
    pub fn resolve_script(&self, runs: &str) -> PathBuf {
        self.root.join(runs)
    }
}

/// Options for `init_workspace`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing files.
    pub force: bool,
}

/// Create `.cursor/` scaffolding in `root`.
///
/// Existing files are left untouched unless `options.force` is set.
pub fn init_workspace(root: &Path, options: &InitOptions) -> Result<WorkspacePaths> {
    let paths = WorkspacePaths::new(root);
    if paths.cursor_dir.exists() && !paths.cursor_dir.is_dir() {
        return Err(anyhow!("init: .cursor exists but is not a directory"));
    }

    create_dir(&paths.agents_dir)?;
    create_dir(&paths.tools_dir)?;

    let name = folder_name(root).unwrap_or_else(|| "workspace".to_string());
    let branch = Git::new(root)
        .current_branch_lenient()
        .unwrap_or_else(|| "main".to_string());

    write_json_if_missing(&paths.ecosystem_path, &Ecosystem::default(), options)?;
    write_json_if_missing(&paths.state_path, &default_state(), options)?;
    write_json_if_missing(
        &paths.workspace_path,
        &json!({
            "name": name,
            "branch": branch,
            "created": now_timestamp(),
            "env": {},
            "tools": []
        }),
        options,
    )?;
    write_json_if_missing(&paths.tool_manifest_path, &json!({"tools": {}}), options)?;
    if options.force || !paths.config_path.exists() {
        write_config(&paths.config_path, &RunnerConfig::default())?;
    }

    Ok(paths)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("create directory {}", path.display()))
}

fn write_json_if_missing<T: Serialize>(
    path: &Path,
    value: &T,
    options: &InitOptions,
) -> Result<()> {
    if !options.force && path.exists() {
        debug!(path = %path.display(), "keeping existing file");
        return Ok(());
    }
    write_json(path, value)
}
