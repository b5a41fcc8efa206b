// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job service: the surface workflow evaluation and operators call into

use crate::error::ServiceError;
use crate::executor::{AcquiredJob, ExecutionOutcome, JobExecutor};
use rj_core::{
    ActivityRef, Clock, IdGen, Job, JobError, JobId, JobOwner, JobQuery, JobState, JobStore,
    RetryPolicy, RetryPolicyResolver, StoreError, WorkerId,
};

/// Attempts at a read-modify-write before a conflict is reported
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Worker id recorded on jobs executed by hand
pub const MANUAL_WORKER: &str = "manual";

/// Creates, runs, and manages jobs
pub struct JobService<S, C, I> {
    executor: JobExecutor<S, C>,
    resolver: RetryPolicyResolver,
    id_gen: I,
}

impl<S, C, I> JobService<S, C, I>
where
    S: JobStore,
    C: Clock,
    I: IdGen,
{
    pub fn new(executor: JobExecutor<S, C>, resolver: RetryPolicyResolver, id_gen: I) -> Self {
        Self {
            executor,
            resolver,
            id_gen,
        }
    }

    pub fn executor(&self) -> &JobExecutor<S, C> {
        &self.executor
    }

    /// Create a job for `activity`, resolving its retry policy first
    pub fn create_job(&self, owner: JobOwner, activity: &ActivityRef) -> Result<Job, ServiceError> {
        let policy = self.resolver.resolve_activity(activity)?;
        self.create_job_with_policy(owner, policy)
    }

    /// Create a job with an already resolved policy
    pub fn create_job_with_policy(
        &self,
        owner: JobOwner,
        policy: RetryPolicy,
    ) -> Result<Job, ServiceError> {
        let job = Job::new(
            self.id_gen.next_job_id(),
            owner,
            policy,
            self.executor.clock().now(),
        );
        let job = self.executor.store().insert(job)?;
        tracing::info!(
            job_id = %job.id,
            process_instance = %job.owner.process_instance_id,
            activity = %job.owner.activity_id,
            retries = job.retries_remaining,
            "job created"
        );
        Ok(job)
    }

    /// Execute a job now, ignoring its due date
    ///
    /// The job is still locked through the store, so a job held by a live
    /// lease is refused. A failed job may be executed: success removes it,
    /// failure keeps it failed with the new exception.
    pub async fn execute_job(&self, id: &JobId) -> Result<ExecutionOutcome, ServiceError> {
        let worker = WorkerId::new(MANUAL_WORKER);
        let lease = self.executor.config().lease;

        let mut attempt = 0;
        let acquired = loop {
            attempt += 1;
            let mut job = self.require(id)?;
            if job.state == JobState::Suspended {
                return Err(ServiceError::JobSuspended(id.clone()));
            }
            let expected = job.version;
            let reclaimed_from = match job.acquire(&worker, lease, self.executor.clock().now()) {
                Ok(previous) => previous,
                Err(JobError::Locked { job, holder }) => {
                    return Err(ServiceError::JobLocked { job, holder })
                }
                Err(e) => return Err(e.into()),
            };
            match self.executor.store().compare_and_swap(job, expected) {
                Ok(job) => {
                    break AcquiredJob {
                        job,
                        worker: worker.clone(),
                        reclaimed_from,
                    }
                }
                Err(StoreError::Conflict { .. }) if attempt < MAX_WRITE_ATTEMPTS => continue,
                Err(StoreError::NotFound(job)) => return Err(ServiceError::JobNotFound(job)),
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(job_id = %id, "executing job manually");
        Ok(self.executor.execute(acquired).await?)
    }

    pub fn job(&self, id: &JobId) -> Result<Option<Job>, ServiceError> {
        Ok(self.executor.store().get(id)?)
    }

    pub fn jobs_for_process_instance(
        &self,
        process_instance_id: &str,
    ) -> Result<Vec<Job>, ServiceError> {
        self.query(&JobQuery::new().process_instance(process_instance_id))
    }

    /// Jobs matching `query`; states are read at the current time unless
    /// the query names an instant
    pub fn query(&self, query: &JobQuery) -> Result<Vec<Job>, ServiceError> {
        let mut query = query.clone();
        if query.as_of.is_none() {
            query.as_of = Some(self.executor.clock().now());
        }
        Ok(self.executor.store().query(&query)?)
    }

    /// Delete a job; a worker executing it will have its result discarded
    pub fn cancel_job(&self, id: &JobId) -> Result<Job, ServiceError> {
        let job = self
            .executor
            .store()
            .remove(id)?
            .ok_or_else(|| ServiceError::JobNotFound(id.clone()))?;
        tracing::info!(job_id = %id, "job cancelled");
        Ok(job)
    }

    /// Delete every job of a process instance
    pub fn cancel_process_instance(
        &self,
        process_instance_id: &str,
    ) -> Result<Vec<Job>, ServiceError> {
        let mut cancelled = Vec::new();
        for job in self.jobs_for_process_instance(process_instance_id)? {
            if let Some(job) = self.executor.store().remove(&job.id)? {
                cancelled.push(job);
            }
        }
        tracing::info!(
            process_instance = %process_instance_id,
            jobs = cancelled.len(),
            "process instance jobs cancelled"
        );
        Ok(cancelled)
    }

    /// Keep a pending job from being acquired
    pub fn suspend_job(&self, id: &JobId) -> Result<Job, ServiceError> {
        let job = self.update(id, Job::suspend)?;
        tracing::info!(job_id = %id, "job suspended");
        Ok(job)
    }

    /// Return a suspended job to the pending pool
    pub fn activate_job(&self, id: &JobId) -> Result<Job, ServiceError> {
        let job = self.update(id, Job::activate)?;
        tracing::info!(job_id = %id, "job activated");
        Ok(job)
    }

    fn require(&self, id: &JobId) -> Result<Job, ServiceError> {
        self.executor
            .store()
            .get(id)?
            .ok_or_else(|| ServiceError::JobNotFound(id.clone()))
    }

    /// Read, mutate, and compare-and-swap, re-reading on conflict
    fn update(
        &self,
        id: &JobId,
        mutate: impl Fn(&mut Job) -> Result<(), JobError>,
    ) -> Result<Job, ServiceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut job = self.require(id)?;
            let expected = job.version;
            mutate(&mut job)?;
            match self.executor.store().compare_and_swap(job, expected) {
                Ok(job) => return Ok(job),
                Err(StoreError::Conflict { .. }) if attempt < MAX_WRITE_ATTEMPTS => continue,
                Err(StoreError::NotFound(job)) => return Err(ServiceError::JobNotFound(job)),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
