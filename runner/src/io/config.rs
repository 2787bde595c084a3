//! Runner configuration stored under `.cursor/runner.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use super::json_file::write_atomic;

/// Runner configuration (TOML).
///
/// Missing fields fall back to the defaults: scripts run through
/// `sh -c`, primary scripts are awaited without a timeout, and listener agents
/// are enabled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Kill a primary agent script after this many seconds. Unset waits forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_timeout_secs: Option<u64>,

    /// Program and leading arguments used to launch scripts; the resolved
    /// script path is appended as the final argument.
    pub shell: Vec<String>,

    /// Install the listener dispatcher on the event bus.
    pub listeners_enabled: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            script_timeout_secs: None,
            shell: vec!["sh".to_string(), "-c".to_string()],
            listeners_enabled: true,
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.script_timeout_secs == Some(0) {
            return Err(anyhow!("script_timeout_secs must be > 0 when set"));
        }
        if self.shell.is_empty() || self.shell[0].trim().is_empty() {
            return Err(anyhow!("shell must be a non-empty array"));
        }
        Ok(())
    }

    pub fn script_timeout(&self) -> Option<Duration> {
        self.script_timeout_secs.map(Duration::from_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RunnerConfig::default()`.
pub fn load_config(path: &Path) -> Result<RunnerConfig> {
    if !path.exists() {
        let cfg = RunnerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RunnerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RunnerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}
