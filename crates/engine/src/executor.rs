// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job executor
//!
//! Workers share one [`JobStore`]. Each cycle acquires a due job with a
//! versioned compare-and-swap, runs its behavior outside any lock, and
//! commits the outcome against the version it acquired. Whoever holds the
//! current version is the only one who can write, so a worker whose lease
//! was reclaimed or whose job was cancelled simply loses its commit.

use crate::behavior::BehaviorRegistry;
use crate::error::ExecutorError;
use crate::incident::{Incident, IncidentHandler};
use chrono::{DateTime, Utc};
use rj_core::{
    BehaviorError, Clock, ExecutionAttempt, ExecutorConfig, Job, JobState, JobStore, StoreError,
    WorkerId,
};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Shared dependencies of the executor
pub struct ExecutorDeps<S, C> {
    pub store: Arc<S>,
    pub behaviors: BehaviorRegistry,
    pub incidents: Arc<dyn IncidentHandler>,
    pub clock: C,
}

/// A job locked by a worker, as stored right after acquisition
#[derive(Debug, Clone)]
pub struct AcquiredJob {
    pub job: Job,
    pub worker: WorkerId,
    /// Previous holder when an expired lease was taken over
    pub reclaimed_from: Option<WorkerId>,
}

/// What happened to a job after one execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The behavior succeeded and the job was removed
    Succeeded,
    /// The job failed and went back to pending
    Retrying {
        retries_remaining: u32,
        due_date: DateTime<Utc>,
    },
    /// The job failed and is frozen awaiting an operator
    Failed { incident_raised: bool },
    /// The job changed underneath the worker; the result was dropped
    Discarded,
}

/// Acquires and executes jobs from a shared store
pub struct JobExecutor<S, C> {
    store: Arc<S>,
    behaviors: Arc<BehaviorRegistry>,
    incidents: Arc<dyn IncidentHandler>,
    clock: C,
    config: ExecutorConfig,
}

impl<S, C: Clone> Clone for JobExecutor<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            behaviors: Arc::clone(&self.behaviors),
            incidents: Arc::clone(&self.incidents),
            clock: self.clock.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, C> JobExecutor<S, C>
where
    S: JobStore,
    C: Clock,
{
    pub fn new(deps: ExecutorDeps<S, C>, config: ExecutorConfig) -> Self {
        Self {
            store: deps.store,
            behaviors: Arc::new(deps.behaviors),
            incidents: deps.incidents,
            clock: deps.clock,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Lock the next due job for `worker`
    ///
    /// Candidates come earliest due date first. A candidate lost to another
    /// worker is skipped in favor of the next one.
    pub async fn acquire_next(
        &self,
        worker: &WorkerId,
    ) -> Result<Option<AcquiredJob>, ExecutorError> {
        let now = self.clock.now();
        let candidates = self.store.acquirable(now, self.config.acquisition_batch)?;
        tracing::debug!(worker = %worker, candidates = candidates.len(), "acquisition scan");

        for mut job in candidates {
            let expected = job.version;
            let reclaimed_from = match job.acquire(worker, self.config.lease, now) {
                Ok(previous) => previous,
                Err(e) => {
                    tracing::debug!(job_id = %job.id, worker = %worker, error = %e, "skipping candidate");
                    continue;
                }
            };

            match self.store.compare_and_swap(job, expected) {
                Ok(job) => {
                    if let Some(previous) = &reclaimed_from {
                        tracing::warn!(
                            job_id = %job.id,
                            worker = %worker,
                            previous = %previous,
                            "reclaimed job with expired lease"
                        );
                    }
                    return Ok(Some(AcquiredJob {
                        job,
                        worker: worker.clone(),
                        reclaimed_from,
                    }));
                }
                Err(StoreError::Conflict { job, .. }) | Err(StoreError::NotFound(job)) => {
                    tracing::debug!(job_id = %job, worker = %worker, "lock contention");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    /// Run the behavior for an acquired job and commit the outcome
    pub async fn execute(&self, acquired: AcquiredJob) -> Result<ExecutionOutcome, ExecutorError> {
        let span = tracing::info_span!(
            "job",
            job_id = %acquired.job.id,
            worker = %acquired.worker,
        );
        async move {
            let result = self.invoke(&acquired.job).await;
            let attempt = ExecutionAttempt::from_result(result);
            self.commit(acquired, attempt).await
        }
        .instrument(span)
        .await
    }

    /// Acquire one job and execute it
    pub async fn run_once(
        &self,
        worker: &WorkerId,
    ) -> Result<Option<ExecutionOutcome>, ExecutorError> {
        match self.acquire_next(worker).await? {
            Some(acquired) => Ok(Some(self.execute(acquired).await?)),
            None => Ok(None),
        }
    }

    /// Poll for work until `shutdown` turns true
    pub async fn run(&self, worker: WorkerId, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(worker = %worker, "worker started");
        while !*shutdown.borrow() {
            let idle = match self.run_once(&worker).await {
                Ok(Some(_)) => false,
                Ok(None) => true,
                Err(e) => {
                    tracing::error!(worker = %worker, error = %e, "execution cycle failed");
                    true
                }
            };
            if idle {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }
        tracing::info!(worker = %worker, "worker stopped");
    }

    /// Run the behavior in its own task, bounded by the lease
    async fn invoke(&self, job: &Job) -> Result<(), BehaviorError> {
        let behavior = self.behaviors.get(&job.owner.activity_id)?;
        let copy = job.clone();
        let handle = tokio::spawn(async move { behavior.execute(copy).await });
        let abort = handle.abort_handle();

        match tokio::time::timeout(self.config.lease, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(BehaviorError::Panicked(panic_message(join_error))),
            Err(_) => {
                abort.abort();
                Err(BehaviorError::LeaseExpired(self.config.lease))
            }
        }
    }

    async fn commit(
        &self,
        acquired: AcquiredJob,
        attempt: ExecutionAttempt,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        let AcquiredJob { mut job, worker, .. } = acquired;
        let expected = job.version;

        let (cause, fatal) = match attempt {
            ExecutionAttempt::Succeeded => {
                job.mark_succeeded(&worker)?;
                return match self.store.remove_if(&job.id, expected) {
                    Ok(_) => {
                        tracing::info!(attempts = job.attempts, "job succeeded");
                        Ok(ExecutionOutcome::Succeeded)
                    }
                    Err(e) => lost_commit(e),
                };
            }
            ExecutionAttempt::Retryable(cause) => (cause, false),
            ExecutionAttempt::Fatal(cause) => (cause, true),
        };

        let was_failed = job.is_failed();
        let step = job.retry_step(self.clock.now());
        let retries_after = if fatal && self.config.fatal_exhausts_retries {
            0
        } else {
            step.retries_after
        };
        let state = job.apply_failure(&worker, cause.clone(), step.next_due, retries_after)?;

        let job = match self.store.compare_and_swap(job, expected) {
            Ok(job) => job,
            Err(e) => return lost_commit(e),
        };

        if state != JobState::FailedFatal {
            if fatal {
                tracing::error!(retries = job.retries_remaining, exception = %cause, "job failed");
            } else {
                tracing::warn!(retries = job.retries_remaining, exception = %cause, "job failed");
            }
            return Ok(ExecutionOutcome::Retrying {
                retries_remaining: job.retries_remaining,
                due_date: job.due_date,
            });
        }

        if was_failed {
            tracing::warn!(exception = %cause, "manual execution of failed job failed again");
            return Ok(ExecutionOutcome::Failed {
                incident_raised: false,
            });
        }

        self.incidents
            .raise(Incident {
                job_id: job.id.clone(),
                owner: job.owner.clone(),
                exception: cause,
            })
            .await;
        Ok(ExecutionOutcome::Failed {
            incident_raised: true,
        })
    }
}

/// A commit lost because the job was removed or re-locked meanwhile
fn lost_commit(error: StoreError) -> Result<ExecutionOutcome, ExecutorError> {
    match &error {
        StoreError::Conflict { .. } | StoreError::NotFound(_) => {
            tracing::warn!(error = %error, "job changed during execution, discarding result");
            Ok(ExecutionOutcome::Discarded)
        }
        _ => Err(error.into()),
    }
}

fn panic_message(error: tokio::task::JoinError) -> String {
    if !error.is_panic() {
        return "behavior task was cancelled".to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// A fixed set of workers sharing one executor
pub struct WorkerPool {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `config.workers` workers named `<worker_prefix>-<n>`
    pub fn spawn<S, C>(executor: JobExecutor<S, C>) -> Self
    where
        S: JobStore,
        C: Clock,
    {
        let (shutdown, receiver) = watch::channel(false);
        let count = executor.config.workers;
        let prefix = executor.config.worker_prefix.clone();
        let handles = (1..=count)
            .map(|n| {
                let executor = executor.clone();
                let receiver = receiver.clone();
                let worker = WorkerId::new(format!("{}-{}", prefix, n));
                tokio::spawn(async move { executor.run(worker, receiver).await })
            })
            .collect();
        tracing::info!(workers = count, "worker pool started");
        Self { shutdown, handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signal every worker and wait for in-flight executions to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "worker task ended abnormally");
            }
        }
        tracing::info!("worker pool stopped");
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
