// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the executor and the job service

use rj_core::{JobError, JobId, ScheduleError, StoreError, WorkerId};
use thiserror::Error;

/// Errors from acquiring or committing a job
///
/// Behavior failures never show up here; they are written to the job.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("job error: {0}")]
    Job(#[from] JobError),
}

/// Errors from operator-facing job service calls
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid retry cycle: {0}")]
    Schedule(#[from] ScheduleError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("job error: {0}")]
    Job(#[from] JobError),
    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),
    #[error("job not found: {0}")]
    JobNotFound(JobId),
    #[error("job {job} is locked by {holder}")]
    JobLocked { job: JobId, holder: WorkerId },
    #[error("job {0} is suspended")]
    JobSuspended(JobId),
}
