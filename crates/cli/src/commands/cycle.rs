// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rj parse` and `rj resolve`: retry cycle tooling

use crate::output::{self, OutputFormat};
use clap::Args;
use rj_core::{schedule, EngineConfig, RetryPolicy};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Args)]
pub struct ParseArgs {
    /// Retry cycle such as R5/PT5M
    pub expression: String,

    #[arg(long, short, value_enum, default_value_t)]
    pub output: OutputFormat,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Retry cycle declared on the activity
    #[arg(long)]
    pub activity_cycle: Option<String>,

    /// Engine configuration providing the default cycle
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Engine default cycle, overriding the configuration file
    #[arg(long)]
    pub engine_cycle: Option<String>,

    #[arg(long, short, value_enum, default_value_t)]
    pub output: OutputFormat,
}

#[derive(Serialize)]
struct ParsedCycle {
    canonical: String,
    repeat_count: u32,
    cycle_secs: f64,
}

impl fmt::Display for ParsedCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} retries, {}s apart",
            self.canonical, self.repeat_count, self.cycle_secs
        )
    }
}

#[derive(Serialize)]
struct ResolvedPolicy {
    source: &'static str,
    #[serde(flatten)]
    policy: RetryPolicy,
}

impl fmt::Display for ResolvedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (from {})", self.policy, self.source)
    }
}

pub fn parse(args: ParseArgs) -> anyhow::Result<()> {
    let parsed = schedule::parse(&args.expression)?;
    let info = ParsedCycle {
        canonical: parsed.to_string(),
        repeat_count: parsed.repeat_count,
        cycle_secs: parsed.cycle.as_secs_f64(),
    };
    output::print(&info, args.output)
}

pub fn resolve(args: ResolveArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let mut defaults = config.retry_defaults()?;
    if let Some(cycle) = &args.engine_cycle {
        defaults.engine_schedule = Some(schedule::parse(cycle)?);
    }

    let policy = rj_core::resolve(
        args.activity_cycle.as_deref(),
        defaults.engine_schedule.as_ref(),
        defaults.default_retries,
    )?;
    let source = if args.activity_cycle.is_some() {
        "activity"
    } else if defaults.engine_schedule.is_some() {
        "engine default"
    } else {
        "fallback"
    };
    output::print(&ResolvedPolicy { source, policy }, args.output)
}
