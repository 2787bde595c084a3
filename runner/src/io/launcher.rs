//! Script launcher abstraction.
//!
//! The [`ScriptLauncher`] trait decouples the engine and the listener
//! dispatcher from real process spawning. Tests use a recording launcher that
//! returns scripted exit codes without spawning anything.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, instrument};

use super::process::{ProcessOutcome, run_inherited, spawn_detached};

/// One script invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRequest {
    /// Absolute path of the script.
    pub script: PathBuf,
    /// Working directory (the workspace root).
    pub workdir: PathBuf,
    /// Variables added on top of the inherited environment; later entries win.
    pub env: Vec<(String, String)>,
}

pub trait ScriptLauncher: Send + Sync {
    /// Run the script to completion with inherited stdio.
    /// `Err` means the script could not be started.
    fn run(&self, request: &ScriptRequest) -> Result<ProcessOutcome>;

    /// Start the script with discarded stdio and return without waiting.
    fn spawn_detached(&self, request: &ScriptRequest) -> Result<()>;
}

/// Launches scripts through a shell prefix (default `sh -c <script>`).
#[derive(Debug, Clone)]
pub struct ShellLauncher {
    shell: Vec<String>,
    timeout: Option<Duration>,
}

impl ShellLauncher {
    pub fn new(shell: Vec<String>, timeout: Option<Duration>) -> Self {
        Self { shell, timeout }
    }

    fn command(&self, request: &ScriptRequest) -> Result<Command> {
        let (program, args) = self
            .shell
            .split_first()
            .ok_or_else(|| anyhow!("shell must be a non-empty array"))?;
        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg(&request.script)
            .current_dir(&request.workdir)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        Ok(cmd)
    }
}

impl ScriptLauncher for ShellLauncher {
    #[instrument(skip_all, fields(script = %request.script.display()))]
    fn run(&self, request: &ScriptRequest) -> Result<ProcessOutcome> {
        debug!("running script");
        run_inherited(self.command(request)?, self.timeout)
    }

    #[instrument(skip_all, fields(script = %request.script.display()))]
    fn spawn_detached(&self, request: &ScriptRequest) -> Result<()> {
        spawn_detached(self.command(request)?)?;
        Ok(())
    }
}
