//! Git adapter used for workspace branch checks.
//!
//! Git is optional: a missing binary or a non-repository root simply yields
//! no branch, never an error for the caller.

use std::path::PathBuf;
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Current branch name, or `None` on detached HEAD.
    #[instrument(skip_all)]
    pub fn current_branch(&self) -> Result<Option<String>> {
        let out = self.run_capture(&["branch", "--show-current"])?;
        let branch = parse_branch_output(&out);
        debug!(branch = ?branch, "current branch");
        Ok(branch)
    }

    /// Like [`Git::current_branch`], but treats any git failure as "no branch".
    pub fn current_branch_lenient(&self) -> Option<String> {
        match self.current_branch() {
            Ok(branch) => branch,
            Err(err) => {
                debug!(err = %format!("{err:#}"), "git branch unavailable");
                None
            }
        }
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

fn parse_branch_output(out: &str) -> Option<String> {
    let name = out.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
