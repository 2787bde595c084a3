//! CLI tests for the `space-runner` binary.
//!
//! Spawns the binary against temp workspaces and checks exit codes and
//! printed output.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use space_runner::exit_codes;
use space_runner::io::config::{RunnerConfig, write_config};
use space_runner::test_support::TestWorkspace;

fn space_runner(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_space-runner"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("spawn space-runner")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn list_prints_agents_and_placeholders() {
    let ws = TestWorkspace::new().expect("workspace");
    ws.agent_json(
        "init-agent",
        json!({"name": "init-agent", "version": "1.2.0", "description": "Bootstrap"}),
    )
    .expect("agent");
    ws.register("ghost").expect("register");

    let output = space_runner(&ws.root(), &["list"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let out = stdout(&output);
    assert!(out.starts_with("Registered agents:\n"));
    assert!(out.contains(" - init-agent v1.2.0 :: Bootstrap\n"));
    assert!(out.contains(" - ghost (failed to load: "));
}

#[test]
fn list_without_ecosystem_fails() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = space_runner(temp.path(), &["list"]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILURE));
    assert!(stderr(&output).contains("[ERROR] load ecosystem"));
}

#[test]
fn run_unknown_agent_exits_with_failure() {
    let ws = TestWorkspace::new().expect("workspace");

    let output = space_runner(&ws.root(), &["run", "nobody"]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILURE));
    let err = stderr(&output);
    assert!(err.contains("[ERROR]"));
    assert!(err.contains("nobody"));
}

#[test]
fn run_with_missing_script_still_succeeds() {
    let ws = TestWorkspace::new().expect("workspace");
    ws.agent_json(
        "ghost",
        json!({"name": "ghost", "runs": "scripts/missing.sh"}),
    )
    .expect("agent");

    let output = space_runner(&ws.root(), &["run", "ghost"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
}

#[cfg(unix)]
#[test]
fn run_with_deps_executes_scripts_and_updates_state() {
    let ws = TestWorkspace::new().expect("workspace");
    // Read scripts through `sh` so a freshly written file is never exec'd.
    write_config(
        &ws.paths().config_path,
        &RunnerConfig {
            shell: vec!["sh".to_string()],
            ..RunnerConfig::default()
        },
    )
    .expect("config");
    ws.script(
        "scripts/prepare.sh",
        "#!/bin/sh\nprintf '%s\\n' \"prepare $SPACE_WORKSPACE_BRANCH\" >> trace.txt\n",
    )
    .expect("prepare script");
    ws.script(
        "scripts/init.sh",
        "#!/bin/sh\nprintf '%s\\n' \"init $SPACE_WORKSPACE_NAME\" >> trace.txt\n",
    )
    .expect("init script");
    ws.agent_json(
        "prepare",
        json!({"name": "prepare", "runs": "scripts/prepare.sh"}),
    )
    .expect("prepare");
    ws.agent_json(
        "init-agent",
        json!({
            "name": "init-agent",
            "runs": "scripts/init.sh",
            "dependencies": ["prepare"],
            "output": {"updatesState": true, "stateKeys": ["flags.initialized"]}
        }),
    )
    .expect("init-agent");

    let output = space_runner(&ws.root(), &["run", "init-agent", "--with-deps"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK), "{}", stderr(&output));
    let trace = fs::read_to_string(ws.root().join("trace.txt")).expect("trace");
    assert_eq!(trace, format!("prepare main\ninit {}\n", ws.name()));
    assert_eq!(ws.state().expect("state")["flags"]["initialized"], true);
}

/// Wait for a detached child to produce `path`.
#[cfg(unix)]
fn wait_for_file(path: &Path, timeout: Duration) -> Option<String> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(contents) = fs::read_to_string(path) {
            return Some(contents);
        }
        thread::sleep(Duration::from_millis(50));
    }
    None
}

#[cfg(unix)]
#[test]
fn listener_script_runs_detached_with_event_env() {
    let ws = TestWorkspace::new().expect("workspace");
    write_config(
        &ws.paths().config_path,
        &RunnerConfig {
            shell: vec!["sh".to_string()],
            ..RunnerConfig::default()
        },
    )
    .expect("config");
    ws.script("scripts/worker.sh", "#!/bin/sh\nexit 0\n")
        .expect("worker script");
    // Write then rename so the test never reads a partial file.
    ws.script(
        "scripts/listen.sh",
        "#!/bin/sh\necho listener-stdout\nprintf '%s %s' \"$SPACE_EVENT_NAME\" \"$SPACE_EVENT_PAYLOAD\" > event.tmp\nmv event.tmp event.txt\n",
    )
    .expect("listener script");
    ws.agent_json(
        "worker",
        json!({"name": "worker", "runs": "scripts/worker.sh"}),
    )
    .expect("worker");
    ws.agent_json(
        "listener",
        json!({"name": "listener", "runs": "scripts/listen.sh", "listens": ["onAgentEnd"]}),
    )
    .expect("listener");

    let output = space_runner(&ws.root(), &["run", "worker"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK), "{}", stderr(&output));
    assert!(!stdout(&output).contains("listener-stdout"));
    let event = wait_for_file(&ws.root().join("event.txt"), Duration::from_secs(10))
        .expect("listener wrote event.txt");
    assert_eq!(event, r#"onAgentEnd {"agent":"worker"}"#);
}

#[test]
fn workspace_info_prints_context_json() {
    let ws = TestWorkspace::new().expect("workspace");

    let output = space_runner(&ws.root(), &["workspace-info"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let ctx: Value = serde_json::from_str(&stdout(&output)).expect("context json");
    assert_eq!(ctx["workspace"]["name"], ws.name());
    assert_eq!(ctx["workspace"]["branch"], "main");
    assert_eq!(ctx["state"]["flags"]["initialized"], false);
}

#[test]
fn workspace_info_rejects_invalid_workspace() {
    let ws = TestWorkspace::new().expect("workspace");
    fs::write(&ws.paths().workspace_path, r#"{"name": "", "branch": "main"}"#)
        .expect("workspace");

    let output = space_runner(&ws.root(), &["workspace-info"]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILURE));
    assert!(stderr(&output).contains("workspace validation failed"));
}

#[test]
fn init_scaffolds_cursor_directory() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = space_runner(temp.path(), &["init"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let cursor = temp.path().join(".cursor");
    for file in [
        "ecosystem.json",
        "state.json",
        "workspace.json",
        "runner.toml",
    ] {
        assert!(cursor.join(file).is_file(), "missing {file}");
    }
    assert!(cursor.join("agents").is_dir());

    let listed = space_runner(temp.path(), &["list"]);
    assert_eq!(listed.status.code(), Some(exit_codes::OK));
    assert_eq!(stdout(&listed), "Registered agents:\n");
}

#[test]
fn no_command_prints_help() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = space_runner(temp.path(), &[]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("Usage"));
}

#[test]
fn unknown_command_is_a_usage_error() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = space_runner(temp.path(), &["deploy"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Usage"));
}
