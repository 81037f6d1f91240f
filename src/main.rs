mod analysis;
mod cli;
mod commands;
mod config;
mod corpus;
mod model;
mod util;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::cli::{Cli, Commands};
use crate::config::PipelineConfig;

fn main() {
    let cli = Cli::parse();

    let _log_guard = match init_tracing(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialise logging: {err:#}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(cli) {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let outcome = match cli.command {
        Commands::BuildBySlide(args) => {
            commands::build_by_slide::run(&PipelineConfig::resolve(&args)?)?
        }
        Commands::Coverage(args) => commands::coverage::run(&PipelineConfig::resolve(&args)?)?,
        Commands::Agreement(args) => commands::agreement::run(&PipelineConfig::resolve(&args)?)?,
        Commands::ConceptOverlap(args) => {
            commands::concept_overlap::run(&PipelineConfig::resolve(&args)?)?
        }
        Commands::Fuse(args) => commands::fuse::run(&PipelineConfig::resolve(&args)?)?,
        Commands::EvaluateConsensus(args) => {
            commands::consensus_eval::run(&PipelineConfig::resolve(&args)?)?
        }
        Commands::EvaluateReference(args) => {
            commands::reference_eval::run(&PipelineConfig::resolve(&args)?)?
        }
        Commands::Run(args) => {
            commands::pipeline::run(&PipelineConfig::resolve(&args)?)?;
            return Ok(());
        }
    };

    if outcome.skipped {
        warn!(stage = outcome.stage, "stage skipped; no output written");
    }
    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(env_filter());

    let Some(path) = log_file else {
        tracing_subscriber::registry().with(stderr_layer).init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("log file path has no file name: {}", path.display()))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    util::ensure_directory(directory)?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(env_filter());

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(Some(guard))
}
