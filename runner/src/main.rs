//! `space-runner`: run declarative workspace agents.
//!
//! Reads `.cursor/` under the workspace root (default: current directory).
//! Only load failures of the requested document exit non-zero; script
//! failures are reported through logs and `onError` events.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use space_runner::bus::EventBus;
use space_runner::dispatch::ListenerDispatcher;
use space_runner::engine::{Engine, RunOptions};
use space_runner::exit_codes;
use space_runner::info::workspace_info;
use space_runner::io::agents::{AgentRepository, FsAgentRepository};
use space_runner::io::config::load_config;
use space_runner::io::init::{InitOptions, WorkspacePaths, init_workspace};
use space_runner::io::launcher::{ScriptLauncher, ShellLauncher};
use space_runner::io::workspace::WorkspaceLoader;
use space_runner::list::list_agents;
use space_runner::logging;

#[derive(Parser)]
#[command(
    name = "space-runner",
    version,
    about = "Run declarative workspace agents"
)]
struct Cli {
    /// Workspace root containing `.cursor/`.
    #[arg(short = 'C', long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List every registered agent.
    List,
    /// Run an agent.
    Run {
        /// Agent name from `.cursor/ecosystem.json`.
        name: String,
        /// Run dependencies (recursively) first.
        #[arg(long)]
        with_deps: bool,
    },
    /// Print the resolved workspace context as JSON.
    WorkspaceInfo,
    /// Create `.cursor/` scaffolding if missing.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("[ERROR] {:#}", err);
        std::process::exit(exit_codes::FAILURE);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let paths = WorkspacePaths::new(&cli.root);
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Init { force } => cmd_init(&paths, force),
        Command::List => cmd_list(&Runtime::load(paths)?),
        Command::Run { name, with_deps } => cmd_run(Runtime::load(paths)?, &name, with_deps),
        Command::WorkspaceInfo => cmd_workspace_info(&Runtime::load(paths)?),
    }
}

/// Collaborators shared by the commands that read `.cursor/`.
struct Runtime {
    bus: Arc<EventBus>,
    repo: Arc<dyn AgentRepository>,
    launcher: Arc<dyn ScriptLauncher>,
    loader: WorkspaceLoader,
}

impl Runtime {
    fn load(paths: WorkspacePaths) -> Result<Self> {
        let cfg = load_config(&paths.config_path)?;
        let bus = Arc::new(EventBus::new());
        let repo: Arc<dyn AgentRepository> = Arc::new(FsAgentRepository::new(paths.clone()));
        let launcher: Arc<dyn ScriptLauncher> =
            Arc::new(ShellLauncher::new(cfg.shell.clone(), cfg.script_timeout()));
        let loader = WorkspaceLoader::new(paths);

        if cfg.listeners_enabled {
            Arc::new(ListenerDispatcher::new(
                loader.clone(),
                repo.clone(),
                launcher.clone(),
            ))
            .install(&bus);
        }

        Ok(Self {
            bus,
            repo,
            launcher,
            loader,
        })
    }
}

fn cmd_init(paths: &WorkspacePaths, force: bool) -> Result<()> {
    let paths = init_workspace(&paths.root, &InitOptions { force })?;
    println!("Initialized {}", paths.cursor_dir.display());
    Ok(())
}

fn cmd_list(rt: &Runtime) -> Result<()> {
    let listings = list_agents(rt.repo.as_ref())?;
    println!("Registered agents:");
    for listing in listings {
        println!("{listing}");
    }
    Ok(())
}

fn cmd_run(rt: Runtime, name: &str, with_deps: bool) -> Result<()> {
    let engine = Engine::new(rt.loader, rt.repo, rt.launcher, rt.bus);
    engine.run(name, RunOptions { with_deps })?;
    Ok(())
}

fn cmd_workspace_info(rt: &Runtime) -> Result<()> {
    let ctx = workspace_info(&rt.loader, &rt.bus)?;
    println!("{}", serde_json::to_string_pretty(&ctx)?);
    Ok(())
}
