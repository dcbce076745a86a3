// ABOUTME: Entry point for the stevedore CLI.
// ABOUTME: Wires the environment, logger, tracer, repository, and manager.

mod cli;

use clap::Parser;
use cli::Cli;
use std::sync::Arc;
use std::time::Duration;
use stevedore::build::{BuildProperties, BuilderFactory};
use stevedore::deploy::{DeploymentManager, LockPolicy};
use stevedore::env::Environment;
use stevedore::error::{Error, Result};
use stevedore::logger::{ConsoleLogger, Logger, OutputMode};
use stevedore::repository::GitRepository;
use stevedore::trace::Tracer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage errors exit 1, matching the deployment failure code.
            let printed_ok = e.exit_code() == 0;
            let _ = e.print();
            std::process::exit(if printed_ok { 0 } else { 1 });
        }
    };

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let logger = Arc::new(ConsoleLogger::new(mode));

    if let Err(e) = run(cli, logger.clone()).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    // The accumulated error flag is the success signal, not a return value.
    if logger.has_errors() {
        std::process::exit(1);
    }
}

async fn run(cli: Cli, logger: Arc<ConsoleLogger>) -> Result<()> {
    let env = Environment::for_root(cli.app_root)?;
    if !env.root().is_dir() {
        return Err(Error::RootNotFound(env.root().to_path_buf()));
    }

    let tracer = match Tracer::create(&env.trace_file_path()) {
        Ok(tracer) => tracer,
        Err(e) => {
            tracing::warn!("failed to open trace file: {e}; tracing disabled for this run");
            Tracer::disabled()
        }
    };

    let repository = GitRepository::new(env.repository_path());
    let properties = BuildProperties::with_extensions_path(&cli.extensions_path);
    let builder_factory = BuilderFactory::new(properties);

    let policy = match cli.wait {
        Some(secs) => LockPolicy::Wait(Duration::from_secs(secs)),
        None => LockPolicy::NoWait,
    };

    let logger: Arc<dyn Logger> = logger;
    let manager = DeploymentManager::new(env, repository, builder_factory, logger, tracer)
        .with_lock_policy(policy)
        .with_force(cli.force);

    manager.deploy().await?;
    Ok(())
}
