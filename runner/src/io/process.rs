//! Helpers for running child processes: blocking with inherited stdio, or
//! detached fire-and-forget.

use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// How a blocking child finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code; `None` when terminated by a signal or killed on timeout.
    pub code: Option<i32>,
    pub timed_out: bool,
}

impl ProcessOutcome {
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            timed_out: false,
        }
    }

    pub fn success(&self) -> bool {
        !self.timed_out && self.code == Some(0)
    }

    fn from_status(status: ExitStatus, timed_out: bool) -> Self {
        Self {
            code: status.code(),
            timed_out,
        }
    }
}

/// Run a command to completion with the parent's stdio inherited.
///
/// `timeout = None` waits indefinitely. On timeout the child is killed and
/// reaped. An `Err` means the child could not be started or waited on.
#[instrument(skip_all, fields(timeout = ?timeout))]
pub fn run_inherited(mut cmd: Command, timeout: Option<Duration>) -> Result<ProcessOutcome> {
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let Some(timeout) = timeout else {
        let status = child.wait().context("wait for command")?;
        debug!(exit_code = ?status.code(), "command finished");
        return Ok(ProcessOutcome::from_status(status, false));
    };

    let outcome = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => ProcessOutcome::from_status(status, false),
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            child.kill().context("kill command")?;
            let status = child.wait().context("wait command after kill")?;
            ProcessOutcome::from_status(status, true)
        }
    };
    debug!(exit_code = ?outcome.code, timed_out = outcome.timed_out, "command finished");
    Ok(outcome)
}

/// Spawn a command with null stdio and return without waiting.
///
/// A background thread reaps the child so it does not linger as a zombie.
/// The thread is never joined, so it cannot keep the host process alive.
#[instrument(skip_all)]
pub fn spawn_detached(mut cmd: Command) -> Result<u32> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    let child = cmd.spawn().context("spawn detached command")?;
    let pid = child.id();
    debug!(pid, "detached child spawned");
    reap_in_background(child);
    Ok(pid)
}

fn reap_in_background(mut child: Child) {
    let spawned = thread::Builder::new()
        .name("reap-listener".to_string())
        .spawn(move || {
            if let Err(err) = child.wait() {
                debug!(err = %err, "failed to reap detached child");
            }
        });
    if let Err(err) = spawned {
        warn!(err = %err, "failed to start reaper thread");
    }
}
