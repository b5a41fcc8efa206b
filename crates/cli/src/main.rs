// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rj - retry job inspection CLI

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{config, cycle, jobs};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "rj",
    version,
    about = "rj - inspect retry policies and the job table"
)]
struct Cli {
    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an engine configuration file
    Check(config::CheckArgs),
    /// Parse a retry cycle expression
    Parse(cycle::ParseArgs),
    /// Resolve the retry policy an activity would get
    Resolve(cycle::ResolveArgs),
    /// Inspect and manage jobs in a job table WAL
    Jobs(jobs::JobsArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Check(args) => config::check(args),
        Commands::Parse(args) => cycle::parse(args),
        Commands::Resolve(args) => cycle::resolve(args),
        Commands::Jobs(args) => jobs::handle(args),
    }
}

/// Install the tracing subscriber; `RUST_LOG` overrides the default level
fn setup_logging(
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        std::fs::create_dir_all(dir)?;
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("invalid log file path: {}", path.display()))?;
    let appender = tracing_appender::rolling::never(dir.unwrap_or(Path::new(".")), file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();
    Ok(Some(guard))
}
