// Codeplan - command line entry point

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use codeplan::models::settings::AppConfig;
use codeplan::server;
use codeplan::services::plan_mode::{
    FileMap, Orchestrator, OrchestratorConfig, RunStop, SessionEvent, TaskStatus, TurnOutcome,
};
use codeplan::services::project::{write_files, DirectoryProjectStore, ProjectStore};
use codeplan::state::AppState;
use codeplan::storage::load_config;

#[derive(Parser)]
#[command(name = "codeplan")]
#[command(about = "Plan and execute model-driven code changes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Listen address, overrides the config
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Run one turn against a project directory
    Run {
        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Project root to snapshot
        #[arg(long)]
        project_dir: PathBuf,

        /// Write changed files back to the project directory
        #[arg(long)]
        write: bool,

        /// The request
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, bind } => {
            let config = load(config.as_deref())?;
            let addr = match bind {
                Some(addr) => addr,
                None => config
                    .bind
                    .parse()
                    .with_context(|| format!("invalid bind address {}", config.bind))?,
            };
            let state = AppState::from_config(config)?;
            server::serve(state, addr).await?;
        }
        Commands::Run {
            config,
            project_dir,
            write,
            query,
        } => {
            let config = load(config.as_deref())?;
            run_once(config, &project_dir, write, &query).await?;
        }
    }

    Ok(())
}

fn load(path: Option<&Path>) -> Result<AppConfig> {
    let config = load_config(path)?;
    init_tracing(&config.log_level);
    Ok(config)
}

fn init_tracing(fallback_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_once(config: AppConfig, project_dir: &Path, write: bool, query: &str) -> Result<()> {
    let state = AppState::from_config(config)?;
    let store = Arc::new(DirectoryProjectStore::new(project_dir));
    let mut session = Orchestrator::new(
        state.provider.clone(),
        store.clone(),
        OrchestratorConfig::from(state.config.as_ref()),
    );
    if !session.has_project() {
        bail!("project directory {} does not exist", project_dir.display());
    }
    let before = store
        .load_current_project()
        .map(|p| p.files)
        .unwrap_or_default();

    let printer = tokio::spawn(print_events(session.subscribe()));

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("cancelling after the current task...");
            ctrl_c.cancel();
        }
    });

    let outcome = session.submit_with_cancel(query, cancel).await;
    let after = session.files().clone();
    drop(session);
    let _ = printer.await;

    match outcome? {
        TurnOutcome::Responded { text } => println!("{}", text),
        TurnOutcome::Planned(report) => {
            println!("planned {} task(s)", report.tasks.len());
            println!(
                "{}/{} task(s) completed",
                report.completed_count(),
                report.tasks.len()
            );
            match &report.stop {
                RunStop::Finished => {}
                RunStop::Failed { index, reason } => {
                    println!("task {} failed: {}", index + 1, reason)
                }
                RunStop::Cancelled { next_index } => {
                    println!("cancelled before task {}", next_index + 1)
                }
                RunStop::NoProject => println!("no project loaded, nothing executed"),
            }

            let changed = changed_files(&before, &after);
            if write && !changed.is_empty() {
                let written = write_files(project_dir, &changed)?;
                println!("wrote {} file(s)", written.len());
            } else {
                for path in changed.keys() {
                    println!("changed: {}", path);
                }
            }
        }
    }

    Ok(())
}

/// Files in `after` that are new or differ from `before`.
fn changed_files(before: &FileMap, after: &FileMap) -> FileMap {
    after
        .iter()
        .filter(|(path, code)| before.get(*path) != Some(*code))
        .map(|(path, code)| (path.clone(), code.clone()))
        .collect()
}

async fn print_events(mut rx: tokio::sync::broadcast::Receiver<SessionEvent>) {
    loop {
        match rx.recv().await {
            Ok(SessionEvent::PlanUpdated { tasks }) => {
                for (i, task) in tasks.iter().enumerate() {
                    if task.status == TaskStatus::Running {
                        eprintln!("[{}/{}] {}", i + 1, tasks.len(), task.title);
                    }
                }
            }
            Ok(SessionEvent::FilesChanged(delta)) => {
                for path in delta.changed.keys() {
                    eprintln!("  ~ {}", path);
                }
            }
            Ok(SessionEvent::PhaseChanged { .. } | SessionEvent::TurnAppended { .. }) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "run: event printer lagged behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
