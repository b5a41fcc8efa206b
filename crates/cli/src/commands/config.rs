// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rj check`: validate an engine configuration file

use crate::output::{self, OutputFormat};
use anyhow::Context;
use clap::Args;
use rj_core::EngineConfig;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Args)]
pub struct CheckArgs {
    /// Path to the engine TOML configuration
    #[arg(long, short)]
    pub config: PathBuf,

    #[arg(long, short, value_enum, default_value_t)]
    pub output: OutputFormat,
}

#[derive(Serialize)]
struct ConfigSummary {
    engine_retry_cycle: Option<String>,
    default_retries: u32,
    workers: usize,
    lease_secs: u64,
    poll_interval_ms: u64,
    fatal_exhausts_retries: bool,
}

impl fmt::Display for ConfigSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "configuration ok")?;
        match &self.engine_retry_cycle {
            Some(cycle) => writeln!(f, "  engine retry cycle: {}", cycle)?,
            None => writeln!(
                f,
                "  engine retry cycle: none ({} retries)",
                self.default_retries
            )?,
        }
        writeln!(f, "  workers: {}", self.workers)?;
        writeln!(f, "  lease: {}s", self.lease_secs)?;
        writeln!(f, "  poll interval: {}ms", self.poll_interval_ms)?;
        write!(f, "  fatal exhausts retries: {}", self.fatal_exhausts_retries)
    }
}

pub fn check(args: CheckArgs) -> anyhow::Result<()> {
    let config = EngineConfig::load(&args.config)
        .with_context(|| format!("invalid configuration {}", args.config.display()))?;
    let defaults = config.retry_defaults()?;

    let summary = ConfigSummary {
        engine_retry_cycle: defaults.engine_schedule.map(|s| s.to_string()),
        default_retries: defaults.default_retries,
        workers: config.executor.workers,
        lease_secs: config.executor.lease.as_secs(),
        poll_interval_ms: config.executor.poll_interval.as_millis() as u64,
        fatal_exhausts_retries: config.executor.fatal_exhausts_retries,
    };
    output::print(&summary, args.output)
}
