// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rj jobs`: inspect and manage a WAL-backed job table

use crate::output::{self, OutputFormat};
use anyhow::Context;
use clap::{Args, Subcommand};
use rj_core::{
    Clock, ExecutorConfig, Job, JobId, JobQuery, JobState, RetryPolicyResolver, SystemClock,
    UuidIdGen,
};
use rj_engine::{BehaviorRegistry, ExecutorDeps, JobExecutor, JobService, LogIncidentHandler};
use rj_storage::JobTable;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args)]
pub struct JobsArgs {
    /// Path to the job table write-ahead log
    #[arg(long, global = true, default_value = "jobs.wal")]
    pub wal: PathBuf,

    #[arg(long, short, global = true, value_enum, default_value_t)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: JobsCommand,
}

#[derive(Subcommand)]
pub enum JobsCommand {
    /// List jobs in creation order
    List {
        /// Only jobs of this process instance
        #[arg(long)]
        process_instance: Option<String>,
        /// Only jobs in this state (pending, locked, suspended, failed)
        #[arg(long)]
        state: Option<JobState>,
        /// Only jobs that recorded a failure
        #[arg(long)]
        with_exception: bool,
    },
    /// Show one job in full
    Show { id: String },
    /// Delete a job
    Cancel { id: String },
    /// Delete every job of a process instance
    CancelInstance { process_instance: String },
    /// Keep a pending job from being acquired
    Suspend { id: String },
    /// Return a suspended job to the pending pool
    Activate { id: String },
}

#[derive(Serialize)]
#[serde(transparent)]
struct JobRow<'a> {
    job: &'a Job,
    /// A lapsed lease shows as pending
    #[serde(skip)]
    state: JobState,
}

impl fmt::Display for JobRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let job = self.job;
        write!(
            f,
            "{:<38} {:<14} {:<8} {:<26} {}",
            job.id.as_str(),
            self.state.to_string(),
            job.retries_remaining,
            job.due_date.to_rfc3339(),
            job.owner.process_instance_id
        )
    }
}

const HEADER: &str = "ID                                     STATE          RETRIES  DUE                        PROCESS INSTANCE";

#[derive(Serialize)]
#[serde(transparent)]
struct JobDetail<'a> {
    job: &'a Job,
    /// A lapsed lease shows as pending
    #[serde(skip)]
    state: JobState,
}

impl fmt::Display for JobDetail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let job = self.job;
        writeln!(f, "Job: {}", job.id)?;
        writeln!(f, "  state: {}", self.state)?;
        writeln!(f, "  process instance: {}", job.owner.process_instance_id)?;
        writeln!(f, "  activity: {}", job.owner.activity_id)?;
        if let Some(parent) = &job.owner.super_process_instance_id {
            writeln!(f, "  called from: {}", parent)?;
        }
        writeln!(f, "  retries remaining: {}", job.retries_remaining)?;
        if let Some(schedule) = &job.schedule {
            writeln!(f, "  retry cycle: {}", schedule)?;
        }
        writeln!(f, "  due: {}", job.due_date.to_rfc3339())?;
        if let Some(owner) = &job.lock_owner {
            let expiration = job
                .lock_expiration
                .map(|e| e.to_rfc3339())
                .unwrap_or_default();
            writeln!(f, "  locked by: {} until {}", owner, expiration)?;
        }
        writeln!(f, "  attempts: {}", job.attempts)?;
        match &job.exception {
            Some(exception) => {
                writeln!(f, "  exception: {}", exception)?;
                write!(f, "  detail: {}", exception.detail)
            }
            None => write!(f, "  exception: none"),
        }
    }
}

type Service = JobService<JobTable, SystemClock, UuidIdGen>;

fn open_service(args: &JobsArgs) -> anyhow::Result<Service> {
    let table = JobTable::open(&args.wal)
        .with_context(|| format!("failed to open job table {}", args.wal.display()))?;
    tracing::debug!(wal = %args.wal.display(), jobs = table.len(), "opened job table");
    let executor = JobExecutor::new(
        ExecutorDeps {
            store: Arc::new(table),
            behaviors: BehaviorRegistry::new(),
            incidents: Arc::new(LogIncidentHandler),
            clock: SystemClock,
        },
        ExecutorConfig::default(),
    );
    Ok(JobService::new(
        executor,
        RetryPolicyResolver::default(),
        UuidIdGen,
    ))
}

pub fn handle(args: JobsArgs) -> anyhow::Result<()> {
    let service = open_service(&args)?;
    let format = args.output;

    match args.command {
        JobsCommand::List {
            process_instance,
            state,
            with_exception,
        } => {
            let mut query = JobQuery::new();
            if let Some(id) = process_instance {
                query = query.process_instance(id);
            }
            if let Some(state) = state {
                query = query.in_state(state);
            }
            if with_exception {
                query = query.with_exception();
            }
            let jobs = service.query(&query)?;
            let now = SystemClock.now();
            let rows: Vec<JobRow<'_>> = jobs
                .iter()
                .map(|job| JobRow {
                    job,
                    state: job.effective_state(now),
                })
                .collect();
            output::print_list(&rows, HEADER, format)
        }
        JobsCommand::Show { id } => {
            let job = service
                .job(&JobId::new(id.as_str()))?
                .ok_or_else(|| anyhow::anyhow!("job not found: {}", id))?;
            let detail = JobDetail {
                job: &job,
                state: job.effective_state(SystemClock.now()),
            };
            output::print(&detail, format)
        }
        JobsCommand::Cancel { id } => {
            let job = service.cancel_job(&JobId::new(id))?;
            println!("Cancelled {}", job.id);
            Ok(())
        }
        JobsCommand::CancelInstance { process_instance } => {
            let jobs = service.cancel_process_instance(&process_instance)?;
            println!("Cancelled {} job(s) of {}", jobs.len(), process_instance);
            Ok(())
        }
        JobsCommand::Suspend { id } => {
            let job = service.suspend_job(&JobId::new(id))?;
            println!("Suspended {}", job.id);
            Ok(())
        }
        JobsCommand::Activate { id } => {
            let job = service.activate_job(&JobId::new(id))?;
            println!("Activated {}", job.id);
            Ok(())
        }
    }
}
