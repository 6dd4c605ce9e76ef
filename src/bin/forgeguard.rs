//! forgeguard CLI — submits a local directory as a validation task against
//! an in-process orchestrator and waits for its terminal result.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use forgeguard::core::codebase::Codebase;
use forgeguard::core::config::ValidationConfig;
use forgeguard::core::task::TaskStatus;
use forgeguard::engine::tool::ProcessToolAdapter;
use forgeguard::engines::default_registry;
use forgeguard::engines::runtime_engine::LocalProcessSandboxProvider;
use forgeguard::orchestrator::{Orchestrator, OrchestratorSettings};

#[derive(Parser)]
#[command(name = "forgeguard", about = "Validation orchestrator CLI")]
struct Cli {
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a local directory as a codebase and wait for the result.
    Validate {
        path: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        engines: Vec<String>,
    },
    /// Print orchestrator health and exit.
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let tool = Arc::new(ProcessToolAdapter);
    let sandbox = Arc::new(LocalProcessSandboxProvider::new(std::env::temp_dir()));
    let registry = Arc::new(default_registry(tool, sandbox));
    let orchestrator = Orchestrator::new(registry, OrchestratorSettings::default());
    orchestrator.start().await;

    let exit = match cli.command {
        Commands::Health => {
            println!("{:#?}", orchestrator.health());
            ExitCode::from(0)
        }
        Commands::Validate { path, config, engines } => {
            run_validate(&orchestrator, path, config, engines).await
        }
    };

    orchestrator.stop(Duration::from_secs(5)).await.ok();
    exit
}

async fn run_validate(
    orchestrator: &Arc<forgeguard::orchestrator::Orchestrator>,
    path: PathBuf,
    config_path: Option<PathBuf>,
    engines: Vec<String>,
) -> ExitCode {
    let codebase = match Codebase::from_directory(&path, path.display().to_string()) {
        Ok(cb) => cb,
        Err(e) => {
            eprintln!("failed to load codebase: {e}");
            return ExitCode::from(2);
        }
    };

    let mut config = match config_path {
        Some(path) => match std::fs::read_to_string(&path).map_err(forgeguard::core::errors::ValidationError::from) {
            Ok(text) => match ValidationConfig::from_yaml(&text) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("invalid config: {e}");
                    return ExitCode::from(2);
                }
            },
            Err(e) => {
                eprintln!("failed to read config: {e}");
                return ExitCode::from(2);
            }
        },
        None => ValidationConfig::default(),
    };
    if !engines.is_empty() {
        config.enabled_engines = engines;
    }

    let task = match orchestrator.submit(codebase, config).await {
        Ok(task) => task,
        Err(e) => {
            eprintln!("submission rejected: {e}");
            return ExitCode::from(2);
        }
    };

    loop {
        match orchestrator.query(&task.id) {
            Ok(result) if result.status.is_terminal() => {
                println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
                return match result.status {
                    TaskStatus::Completed if result.quality_gate => ExitCode::from(0),
                    TaskStatus::Completed => ExitCode::from(1),
                    TaskStatus::Cancelled => ExitCode::from(4),
                    _ => ExitCode::from(3),
                };
            }
            Ok(_) => tokio::time::sleep(Duration::from_millis(100)).await,
            Err(e) => {
                eprintln!("failed to query task: {e}");
                return ExitCode::from(3);
            }
        }
    }
}
